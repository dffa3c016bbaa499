//! Language server for the tryCatch tuple checker.
//!
//! Publishes destructuring diagnostics for open documents on open, change
//! and save, and answers `textDocument/codeAction` with the two quick
//! fixes. Editors connect over stdio through `trytuple lsp`.

pub mod code_actions;
pub mod diagnostics;
pub mod document;
pub mod line_index;
pub mod server;

/// Run the LSP server over stdio. This is the public entry point
/// called by `trytuple lsp`.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    server::run()
}
