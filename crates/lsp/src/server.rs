//! LSP server main loop with request/notification dispatch.
//!
//! Uses `lsp-server` (synchronous, crossbeam-based) for the transport;
//! checking is fast enough to run inline on every change.

use lsp_server::{Connection, Message, Notification, Request, Response};
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument,
    Notification as _, PublishDiagnostics,
};
use lsp_types::request::{CodeActionRequest, Request as _};
use lsp_types::{
    CodeActionKind, CodeActionOptions, CodeActionProviderCapability, InitializeParams,
    PublishDiagnosticsParams, SaveOptions, ServerCapabilities, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Uri,
};
use trytuple_analyze::{resolve, PluginConfig};

use crate::code_actions;
use crate::diagnostics;
use crate::document::DocumentState;

type ServerResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Run the LSP server over stdio until shutdown.
pub fn run() -> ServerResult<()> {
    let (connection, io_threads) = Connection::stdio();
    serve(&connection)?;
    io_threads.join()?;
    Ok(())
}

/// Handshake, then dispatch messages until the client asks to shut down.
pub fn serve(connection: &Connection) -> ServerResult<()> {
    let capabilities = serde_json::to_value(build_capabilities())?;
    let init_params: InitializeParams =
        serde_json::from_value(connection.initialize(capabilities)?)?;
    let config = initial_config(&init_params);
    tracing::info!(?config, "language server initialized");

    let mut docs = DocumentState::new(config);
    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    break;
                }
                handle_request(connection, &docs, req)?;
            }
            Message::Notification(not) => handle_notification(connection, &mut docs, not)?,
            Message::Response(_) => {}
        }
    }
    Ok(())
}

/// Options come from `initializationOptions`, either as the bag itself or
/// nested under a `trytuple` key.
fn initial_config(params: &InitializeParams) -> PluginConfig {
    match &params.initialization_options {
        Some(options) => resolve(options.get("trytuple").unwrap_or(options)),
        None => PluginConfig::default(),
    }
}

fn build_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
                ..Default::default()
            },
        )),
        code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
            code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
            ..Default::default()
        })),
        ..Default::default()
    }
}

fn handle_request(connection: &Connection, docs: &DocumentState, req: Request) -> ServerResult<()> {
    let resp = if req.method == CodeActionRequest::METHOD {
        let params: lsp_types::CodeActionParams = serde_json::from_value(req.params)?;
        let actions = code_actions::compute_code_actions(docs, &params);
        Response::new_ok(req.id, serde_json::to_value(actions)?)
    } else {
        Response::new_err(
            req.id,
            lsp_server::ErrorCode::MethodNotFound as i32,
            format!("method not found: {}", req.method),
        )
    };
    connection.sender.send(Message::Response(resp))?;
    Ok(())
}

fn handle_notification(
    connection: &Connection,
    docs: &mut DocumentState,
    not: Notification,
) -> ServerResult<()> {
    match not.method.as_str() {
        m if m == DidOpenTextDocument::METHOD => {
            let params: lsp_types::DidOpenTextDocumentParams = serde_json::from_value(not.params)?;
            let doc = params.text_document;
            docs.open(doc.uri.as_str(), doc.version, doc.text);
            publish(connection, docs, doc.uri)?;
        }
        m if m == DidChangeTextDocument::METHOD => {
            let params: lsp_types::DidChangeTextDocumentParams =
                serde_json::from_value(not.params)?;
            let uri = params.text_document.uri;
            // FULL sync: the last change carries the whole document.
            let Some(change) = params.content_changes.into_iter().last() else {
                return Ok(());
            };
            if docs.change(uri.as_str(), params.text_document.version, change.text) {
                publish(connection, docs, uri)?;
            }
        }
        m if m == DidSaveTextDocument::METHOD => {
            let params: lsp_types::DidSaveTextDocumentParams = serde_json::from_value(not.params)?;
            if docs.is_open(params.text_document.uri.as_str()) {
                publish(connection, docs, params.text_document.uri)?;
            }
        }
        m if m == DidCloseTextDocument::METHOD => {
            let params: lsp_types::DidCloseTextDocumentParams = serde_json::from_value(not.params)?;
            docs.close(params.text_document.uri.as_str());
            send_diagnostics(connection, params.text_document.uri, Vec::new(), None)?;
        }
        other => tracing::debug!(method = other, "ignoring notification"),
    }
    Ok(())
}

fn publish(connection: &Connection, docs: &DocumentState, uri: Uri) -> ServerResult<()> {
    let diagnostics = diagnostics::compute_diagnostics(docs, uri.as_str());
    let version = docs.version(uri.as_str());
    send_diagnostics(connection, uri, diagnostics, version)
}

/// Send `textDocument/publishDiagnostics` notification to the client.
fn send_diagnostics(
    connection: &Connection,
    uri: Uri,
    diagnostics: Vec<lsp_types::Diagnostic>,
    version: Option<i32>,
) -> ServerResult<()> {
    let params = PublishDiagnosticsParams {
        uri,
        diagnostics,
        version,
    };
    let not = Notification::new(PublishDiagnostics::METHOD.to_string(), params);
    connection.sender.send(Message::Notification(not))?;
    Ok(())
}
