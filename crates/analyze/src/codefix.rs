//! Quick fixes for badly destructured results.
//!
//! Both fixes replace the binding-pattern text and nothing else:
//!
//! - `destructureTryCatchError`: `[<first>, error]`
//! - `destructureTryCatchOmitted`: `[<first>, ,]`, offered only when an
//!   omitted error slot is allowed and the pattern is not already that.

use serde::{Deserialize, Serialize};
use trytuple_core::{NodeId, NodeKind, SyntaxTree};

use crate::config::PluginConfig;
use crate::oracle::TypeOracle;
use crate::types::TypeQuery;
use crate::validator::{classify_pattern, is_tracked_call, PatternVerdict};
use crate::visitor::is_eligible;

pub const FIX_BIND_ERROR: &str = "destructureTryCatchError";
pub const FIX_OMIT_ERROR: &str = "destructureTryCatchOmitted";

/// Name used when the pattern offers nothing to keep.
const FALLBACK_NAME: &str = "result";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub length: usize,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFixAction {
    pub fix_name: String,
    pub description: String,
    pub file: String,
    pub edits: Vec<TextEdit>,
}

/// Fixes for the declaration enclosing `[start, end)`. The range must lie
/// within the binding pattern of an eligible declaration whose initializer
/// is a tracked call. The first fix is the preferred one.
pub fn fixes_for_range(
    tree: &SyntaxTree,
    query: &dyn TypeQuery,
    start: usize,
    end: usize,
    config: &PluginConfig,
) -> Vec<CodeFixAction> {
    let Some(declaration) = enclosing_declaration(tree, start, end) else {
        return Vec::new();
    };
    let NodeKind::VariableDeclaration {
        name: pattern,
        initializer: Some(initializer),
    } = tree.kind(declaration)
    else {
        return Vec::new();
    };
    let (pattern, initializer) = (*pattern, *initializer);
    if classify_pattern(tree, pattern, config.allow_ignored_error) == PatternVerdict::Valid {
        return Vec::new();
    }
    let span = tree.span(pattern);
    if !span.encloses(start, end) || !is_eligible(tree, declaration) {
        return Vec::new();
    }
    if !is_tracked_call(tree, initializer, config, &mut TypeOracle::new(query)) {
        return Vec::new();
    }

    let first = first_name(tree, pattern);
    let edit = |new_text: String| TextEdit {
        start: span.start,
        length: span.len(),
        new_text,
    };

    let mut fixes = vec![CodeFixAction {
        fix_name: FIX_BIND_ERROR.to_string(),
        description: format!("Destructure return as [{}, error]", first),
        file: tree.file_name().to_string(),
        edits: vec![edit(format!("[{}, error]", first))],
    }];
    if config.allow_ignored_error && !is_omitted_pair(tree, pattern) {
        fixes.push(CodeFixAction {
            fix_name: FIX_OMIT_ERROR.to_string(),
            description: format!("Destructure return as [{}, ,] (ignore error)", first),
            file: tree.file_name().to_string(),
            edits: vec![edit(format!("[{}, ,]", first))],
        });
    }
    fixes
}

/// Innermost variable declaration containing `[start, end)`.
fn enclosing_declaration(tree: &SyntaxTree, start: usize, end: usize) -> Option<NodeId> {
    let innermost = tree.innermost_enclosing(start, end)?;
    tree.ancestors(innermost)
        .find(|&id| matches!(tree.kind(id), NodeKind::VariableDeclaration { .. }))
}

/// Text kept in the first slot: a bare identifier, the first element of an
/// array pattern (a rest element contributes its target), or the fallback.
fn first_name(tree: &SyntaxTree, pattern: NodeId) -> String {
    match tree.kind(pattern) {
        NodeKind::Identifier { text } => text.clone(),
        NodeKind::ArrayBindingPattern { elements } if !elements.is_empty() => {
            match tree.kind(elements[0]) {
                NodeKind::BindingElement { rest: true, name } => tree.text_of(*name).to_string(),
                _ => tree.text_of(elements[0]).to_string(),
            }
        }
        _ => FALLBACK_NAME.to_string(),
    }
}

fn is_omitted_pair(tree: &SyntaxTree, pattern: NodeId) -> bool {
    matches!(
        tree.kind(pattern),
        NodeKind::ArrayBindingPattern { elements }
            if elements.len() == 2 && matches!(tree.kind(elements[1]), NodeKind::OmittedExpression)
    )
}

/// Apply non-overlapping edits to `text`.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| std::cmp::Reverse(e.start));
    let mut out = text.to_string();
    for edit in ordered {
        out.replace_range(edit.start..edit.start + edit.length, &edit.new_text);
    }
    out
}
