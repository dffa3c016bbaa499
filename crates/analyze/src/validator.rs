//! The decision procedure: is a candidate a tracked call site, and if so,
//! is its binding pattern an acceptable `[result, error]` shape?

use trytuple_core::{NodeId, NodeKind, SyntaxTree};

use crate::config::PluginConfig;
use crate::diagnostic::{Diagnostic, DiagnosticSink, SourceTag};
use crate::oracle::TypeOracle;
use crate::visitor::CandidateSite;
use crate::{CONVERSION_FUNCTION, ERROR_CODE, ERROR_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternVerdict {
    Valid,
    Invalid,
}

/// Classify a binding pattern.
///
/// | pattern                          | verdict                       |
/// |----------------------------------|-------------------------------|
/// | not an array pattern             | invalid                       |
/// | array pattern, length != 2       | invalid                       |
/// | `[a, b]` (second slot bound)     | valid                         |
/// | `[a, ,]` (second slot omitted)   | valid iff `allow_ignored_error` |
pub fn classify_pattern(
    tree: &SyntaxTree,
    pattern: NodeId,
    allow_ignored_error: bool,
) -> PatternVerdict {
    let NodeKind::ArrayBindingPattern { elements } = tree.kind(pattern) else {
        return PatternVerdict::Invalid;
    };
    if elements.len() != 2 {
        return PatternVerdict::Invalid;
    }
    match tree.kind(elements[1]) {
        NodeKind::BindingElement { .. } => PatternVerdict::Valid,
        NodeKind::OmittedExpression if allow_ignored_error => PatternVerdict::Valid,
        _ => PatternVerdict::Invalid,
    }
}

/// The call an initializer makes: the initializer itself, or the operand
/// of an `await`. Anything else is not a call site.
pub fn call_of(tree: &SyntaxTree, initializer: NodeId) -> Option<NodeId> {
    match tree.kind(initializer) {
        NodeKind::CallExpression { .. } => Some(initializer),
        NodeKind::AwaitExpression { expression }
            if matches!(tree.kind(*expression), NodeKind::CallExpression { .. }) =>
        {
            Some(*expression)
        }
        _ => None,
    }
}

/// A direct `tryCatch(...)` call is always tracked. Any other call is
/// tracked when wrapped calls are checked and its type is the branded
/// result.
pub fn is_tracked_call(
    tree: &SyntaxTree,
    initializer: NodeId,
    config: &PluginConfig,
    oracle: &mut TypeOracle<'_>,
) -> bool {
    let Some(call) = call_of(tree, initializer) else {
        return false;
    };
    let NodeKind::CallExpression { callee, .. } = tree.kind(call) else {
        return false;
    };
    if matches!(tree.kind(*callee), NodeKind::Identifier { text } if text == CONVERSION_FUNCTION) {
        return true;
    }
    if !config.check_wrapped_calls {
        return false;
    }
    let name = tree
        .callee_path(*callee)
        .unwrap_or_else(|| tree.text_of(*callee).to_string());
    oracle.is_tracked(tree, initializer, &name)
}

pub struct Validator<'c, 'q> {
    config: &'c PluginConfig,
    oracle: TypeOracle<'q>,
    source: SourceTag,
}

impl<'c, 'q> Validator<'c, 'q> {
    pub fn new(config: &'c PluginConfig, oracle: TypeOracle<'q>, source: SourceTag) -> Self {
        Validator {
            config,
            oracle,
            source,
        }
    }

    /// Whether the declaration's initializer is a call this checker tracks.
    pub fn is_tracked_call(&mut self, tree: &SyntaxTree, initializer: NodeId) -> bool {
        is_tracked_call(tree, initializer, self.config, &mut self.oracle)
    }

    /// Validate one candidate, reporting at most one diagnostic. Returns
    /// whether a diagnostic was reported.
    pub fn validate(
        &mut self,
        tree: &SyntaxTree,
        site: &CandidateSite,
        sink: &mut dyn DiagnosticSink,
    ) -> bool {
        let Some(initializer) = site.initializer else {
            return false;
        };
        if !self.is_tracked_call(tree, initializer) {
            return false;
        }
        if classify_pattern(tree, site.pattern, self.config.allow_ignored_error)
            == PatternVerdict::Valid
        {
            return false;
        }
        let span = tree.span(site.pattern);
        tracing::debug!(
            file = tree.file_name(),
            start = span.start,
            pattern = tree.text_of(site.pattern),
            "invalid tryCatch destructuring"
        );
        sink.report(Diagnostic {
            file: tree.file_name().to_string(),
            start: span.start,
            length: span.len(),
            message: ERROR_MESSAGE.to_string(),
            severity: self.config.severity,
            code: ERROR_CODE,
            source: self.source.as_str().to_string(),
        });
        true
    }
}
