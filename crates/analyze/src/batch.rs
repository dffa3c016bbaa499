//! Whole-program integration.
//!
//! A compile-step host hands over every file at once together with an
//! already resolved configuration. Diagnostics go straight to the host's
//! sink; nothing about the program is changed.

use serde::Serialize;
use trytuple_core::SyntaxTree;

use crate::config::PluginConfig;
use crate::diagnostic::{DiagnosticSink, SourceTag};
use crate::types::TypeQuery;

/// Host view of a program: its files, their trees, and a type query.
pub trait ProgramHost {
    fn file_names(&self) -> Vec<String>;

    fn syntax_tree(&self, file: &str) -> Option<&SyntaxTree>;

    /// `None` when the host has no type information for `file`.
    fn type_query(&self, file: &str) -> Option<Box<dyn TypeQuery + '_>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub files_checked: usize,
    pub files_skipped: usize,
    pub diagnostics: usize,
}

/// Check every file of `program`, reporting into `sink`.
pub fn run_batch(
    program: &dyn ProgramHost,
    config: &PluginConfig,
    sink: &mut dyn DiagnosticSink,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for file in program.file_names() {
        let Some(tree) = program.syntax_tree(&file) else {
            tracing::info!(file = %file, "skipping file: no source file found");
            summary.files_skipped += 1;
            continue;
        };
        let Some(query) = program.type_query(&file) else {
            tracing::info!(file = %file, "skipping file: no type checker available");
            summary.files_skipped += 1;
            continue;
        };
        let reported = crate::check_file(tree, &*query, config, SourceTag::Batch, sink);
        summary.files_checked += 1;
        summary.diagnostics += reported;
    }
    tracing::info!(
        checked = summary.files_checked,
        skipped = summary.files_skipped,
        diagnostics = summary.diagnostics,
        "batch check finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use crate::Diagnostic;

    #[test]
    fn batch_tags_diagnostics_and_skips_broken_files() {
        let mut project = Project::new();
        project.set_file("a.ts", "const [x] = tryCatch(f);");
        project.set_file("b.ts", "const [x, err] = tryCatch(f);");
        project.set_file("broken.ts", "const = ;");

        let mut sink: Vec<Diagnostic> = Vec::new();
        let summary = run_batch(&project, &PluginConfig::default(), &mut sink);
        assert_eq!(
            summary,
            BatchSummary {
                files_checked: 2,
                files_skipped: 1,
                diagnostics: 1,
            }
        );
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].file, "a.ts");
        assert_eq!(sink[0].source, "trytuple-batch");
    }
}
