//! CheckReport -- aggregated output of one checking run.
//!
//! Collects diagnostics from every file, tallies them by severity, and
//! renders the summary line printed by `trytuple check`.

use serde::Serialize;

use crate::batch::BatchSummary;
use crate::config::{PluginConfig, Severity};
use crate::diagnostic::{Diagnostic, DiagnosticSink};

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub config: PluginConfig,
    pub files_checked: usize,
    pub files_skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckReport {
    pub fn new(config: PluginConfig) -> Self {
        CheckReport {
            config,
            files_checked: 0,
            files_skipped: 0,
            diagnostics: Vec::new(),
            errors: 0,
            warnings: 0,
        }
    }

    pub fn record_batch(&mut self, summary: &BatchSummary) {
        self.files_checked += summary.files_checked;
        self.files_skipped += summary.files_skipped;
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Diagnostics ordered by file, then offset.
    pub fn sort(&mut self) {
        self.diagnostics
            .sort_by(|a, b| (a.file.as_str(), a.start).cmp(&(b.file.as_str(), b.start)));
    }

    pub fn summary_line(&self) -> String {
        let files = if self.files_checked == 1 { "file" } else { "files" };
        if self.diagnostics.is_empty() {
            return format!("Checked {} {}: no problems found", self.files_checked, files);
        }
        format!(
            "Checked {} {}: {} error(s), {} warning(s)",
            self.files_checked, files, self.errors, self.warnings
        )
    }
}

impl DiagnosticSink for CheckReport {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
        self.diagnostics.push(diagnostic);
    }
}
