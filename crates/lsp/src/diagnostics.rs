//! Checker diagnostics to `lsp_types::Diagnostic` conversion.

use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};
use trytuple_analyze::{LanguageService, Severity};

use crate::document::DocumentState;
use crate::line_index::LineIndex;

/// Diagnostics for an open document, host parse failures first. Unknown
/// documents have none.
pub fn compute_diagnostics(docs: &DocumentState, uri: &str) -> Vec<Diagnostic> {
    let Some(text) = docs.text(uri) else {
        return Vec::new();
    };
    let index = LineIndex::new(text);
    docs.service()
        .semantic_diagnostics(uri)
        .into_iter()
        .map(|d| Diagnostic {
            range: index.range(d.start, d.end()),
            severity: Some(match d.severity {
                Severity::Error => DiagnosticSeverity::ERROR,
                Severity::Warning => DiagnosticSeverity::WARNING,
            }),
            code: i32::try_from(d.code).ok().map(NumberOrString::Number),
            source: Some(d.source),
            message: d.message,
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;
    use trytuple_analyze::PluginConfig;

    #[test]
    fn converts_ranges_and_severity() {
        let config = PluginConfig::builder()
            .severity(Severity::Warning)
            .build();
        let mut docs = DocumentState::new(config);
        docs.open(
            "file:///a.ts",
            1,
            "// ok\nconst [x] = tryCatch(f);\n".into(),
        );
        let diags = compute_diagnostics(&docs, "file:///a.ts");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start, Position::new(1, 6));
        assert_eq!(diags[0].range.end, Position::new(1, 9));
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(
            diags[0].code,
            Some(NumberOrString::Number(54600))
        );
        assert_eq!(diags[0].source.as_deref(), Some("trytuple-service"));

        assert!(compute_diagnostics(&docs, "file:///missing.ts").is_empty());
    }

    #[test]
    fn parse_failures_are_errors() {
        let mut docs = DocumentState::new(PluginConfig::default());
        docs.open("file:///bad.ts", 1, "const [x] = tryCatch(f;".into());
        let diags = compute_diagnostics(&docs, "file:///bad.ts");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].source.as_deref(), Some("trytuple-parser"));
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
    }
}
