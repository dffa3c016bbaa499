//! In-memory host.
//!
//! A [`Project`] owns the text of every file, parses each one once when it
//! is set, and serves trees plus a type query built from declared callee
//! types and per-file wrapper inference. It is the upstream service the
//! CLI and the language server decorate.

use std::collections::BTreeMap;

use trytuple_core::{parse, ParseError, SyntaxTree};

use crate::batch::ProgramHost;
use crate::codefix::CodeFixAction;
use crate::config::Severity;
use crate::diagnostic::{Diagnostic, SourceTag};
use crate::infer::InferredTypes;
use crate::service::LanguageService;
use crate::types::{DeclaredTypes, LayeredTypes, TypeQuery};

/// Code used for host parse failures.
pub const PARSE_ERROR_CODE: u32 = 1005;

/// Code used for files the host could not read.
pub const READ_ERROR_CODE: u32 = 5012;

struct Parsed {
    tree: SyntaxTree,
    inferred: InferredTypes,
}

enum Failure {
    Read(String),
    Parse(ParseError),
}

struct ProjectFile {
    text: String,
    parsed: Result<Parsed, Failure>,
}

#[derive(Default)]
pub struct Project {
    files: BTreeMap<String, ProjectFile>,
    declared: DeclaredTypes,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_declared_types(declared: DeclaredTypes) -> Self {
        Project {
            files: BTreeMap::new(),
            declared,
        }
    }

    /// Add or replace a file, parsing it immediately.
    pub fn set_file(&mut self, name: &str, text: impl Into<String>) {
        let text = text.into();
        let parsed = parse(name, &text).map(|tree| {
            let inferred = InferredTypes::infer(&tree);
            Parsed { tree, inferred }
        });
        if let Err(err) = &parsed {
            tracing::debug!(file = name, error = %err, "parse failed");
        }
        self.files.insert(
            name.to_string(),
            ProjectFile {
                text,
                parsed: parsed.map_err(Failure::Parse),
            },
        );
    }

    /// Record a file whose text could not be read. It has no tree and
    /// reports `reason` as a host diagnostic.
    pub fn set_unreadable(&mut self, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(file = name, reason = %reason, "file unreadable");
        self.files.insert(
            name.to_string(),
            ProjectFile {
                text: String::new(),
                parsed: Err(Failure::Read(reason)),
            },
        );
    }

    pub fn remove_file(&mut self, name: &str) -> bool {
        self.files.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn file_text(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(|f| f.text.as_str())
    }

    pub fn parse_error(&self, name: &str) -> Option<&ParseError> {
        match &self.files.get(name)?.parsed {
            Err(Failure::Parse(err)) => Some(err),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ProgramHost for Project {
    fn file_names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn syntax_tree(&self, file: &str) -> Option<&SyntaxTree> {
        self.files
            .get(file)
            .and_then(|f| f.parsed.as_ref().ok())
            .map(|p| &p.tree)
    }

    fn type_query(&self, file: &str) -> Option<Box<dyn TypeQuery + '_>> {
        let parsed = self.files.get(file)?.parsed.as_ref().ok()?;
        Some(Box::new(
            LayeredTypes::new()
                .with(&self.declared)
                .with(&parsed.inferred),
        ))
    }
}

impl LanguageService for Project {
    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        let Some(entry) = self.files.get(file) else {
            return Vec::new();
        };
        let (start, length, message, code) = match &entry.parsed {
            Ok(_) => return Vec::new(),
            Err(Failure::Parse(err)) => {
                let length = if err.offset < entry.text.len() { 1 } else { 0 };
                (err.offset, length, err.message.clone(), PARSE_ERROR_CODE)
            }
            Err(Failure::Read(reason)) => (
                0,
                0,
                format!("cannot read file: {}", reason),
                READ_ERROR_CODE,
            ),
        };
        vec![Diagnostic {
            file: file.to_string(),
            start,
            length,
            message,
            severity: Severity::Error,
            code,
            source: SourceTag::Parser.as_str().to_string(),
        }]
    }

    fn code_fixes_at(&self, _: &str, _: usize, _: usize, _: &[u32]) -> Vec<CodeFixAction> {
        Vec::new()
    }

    fn program(&self) -> Option<&dyn ProgramHost> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::is_tracked_result_type;
    use crate::types::TypeShape;
    use trytuple_core::NodeKind;

    #[test]
    fn parse_failures_become_host_diagnostics() {
        let mut project = Project::new();
        project.set_file("bad.ts", "const x = 'open");
        assert!(project.syntax_tree("bad.ts").is_none());
        assert!(project.type_query("bad.ts").is_none());
        let diags = project.semantic_diagnostics("bad.ts");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, PARSE_ERROR_CODE);
        assert_eq!(diags[0].start, 10);
        assert!(project.parse_error("bad.ts").is_some());

        project.set_file("bad.ts", "const x = 'closed';");
        assert!(project.semantic_diagnostics("bad.ts").is_empty());
        assert!(project.syntax_tree("bad.ts").is_some());
    }

    #[test]
    fn unreadable_files_report_and_skip() {
        let mut project = Project::new();
        project.set_unreadable("b.ts", "stream did not contain valid UTF-8");
        project.set_file("a.ts", "const [r] = tryCatch(f);");
        assert_eq!(project.file_names(), vec!["a.ts", "b.ts"]);
        assert!(project.syntax_tree("b.ts").is_none());
        assert!(project.parse_error("b.ts").is_none());
        assert_eq!(project.file_text("b.ts"), Some(""));

        let diags = project.semantic_diagnostics("b.ts");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, READ_ERROR_CODE);
        assert_eq!(diags[0].source, "trytuple-parser");
        assert_eq!(
            diags[0].message,
            "cannot read file: stream did not contain valid UTF-8"
        );
        assert!(project.semantic_diagnostics("a.ts").is_empty());
    }

    #[test]
    fn declared_types_take_precedence() {
        let mut declared = DeclaredTypes::new();
        declared.declare("remote", TypeShape::tracked_result());
        let mut project = Project::with_declared_types(declared);
        project.set_file("a.ts", "const [v] = remote();");
        let tree = project.syntax_tree("a.ts").unwrap();
        let init = tree
            .descendants(tree.root())
            .find_map(|id| match tree.kind(id) {
                NodeKind::VariableDeclaration { initializer, .. } => *initializer,
                _ => None,
            })
            .unwrap();
        let query = project.type_query("a.ts").unwrap();
        assert!(is_tracked_result_type(&query.type_of(tree, init).unwrap()));
    }

    #[test]
    fn files_can_be_removed() {
        let mut project = Project::new();
        project.set_file("a.ts", "");
        assert!(project.contains("a.ts"));
        assert_eq!(project.file_names(), vec!["a.ts".to_string()]);
        assert!(project.remove_file("a.ts"));
        assert!(!project.remove_file("a.ts"));
        assert!(project.is_empty());
    }
}
