use serde::{Deserialize, Serialize};

use crate::config::Severity;

/// Which integration produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTag {
    /// Incremental, editor-driven checks.
    Service,
    /// Whole-program checks.
    Batch,
    /// Host front-end failures: unparsable or unreadable files.
    Parser,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::Service => "trytuple-service",
            SourceTag::Batch => "trytuple-batch",
            SourceTag::Parser => "trytuple-parser",
        }
    }
}

/// One reported problem, located by byte offset and length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub start: usize,
    pub length: usize,
    pub message: String,
    pub severity: Severity,
    pub code: u32,
    pub source: String,
}

impl Diagnostic {
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Receives diagnostics as they are produced.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
