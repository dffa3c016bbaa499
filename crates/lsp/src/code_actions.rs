//! `textDocument/codeAction` support: the destructuring quick fixes as
//! workspace edits.

use std::collections::HashMap;

use lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, NumberOrString, TextEdit,
    WorkspaceEdit,
};
use trytuple_analyze::LanguageService;

use crate::document::DocumentState;
use crate::line_index::LineIndex;

pub fn compute_code_actions(
    docs: &DocumentState,
    params: &CodeActionParams,
) -> Vec<CodeActionOrCommand> {
    let uri = &params.text_document.uri;
    let Some(text) = docs.text(uri.as_str()) else {
        return Vec::new();
    };
    let index = LineIndex::new(text);
    let start = index.offset(params.range.start);
    let end = index.offset(params.range.end).max(start);

    let error_codes: Vec<u32> = params
        .context
        .diagnostics
        .iter()
        .filter_map(|d| match d.code {
            Some(NumberOrString::Number(code)) => u32::try_from(code).ok(),
            _ => None,
        })
        .collect();
    let fixes = docs
        .service()
        .code_fixes_at(uri.as_str(), start, end, &error_codes);
    tracing::debug!(uri = uri.as_str(), start, end, fixes = fixes.len(), "code actions");

    fixes
        .into_iter()
        .enumerate()
        .map(|(i, fix)| {
            let edits = fix
                .edits
                .iter()
                .map(|e| TextEdit {
                    range: index.range(e.start, e.start + e.length),
                    new_text: e.new_text.clone(),
                })
                .collect();
            CodeActionOrCommand::CodeAction(CodeAction {
                title: fix.description,
                kind: Some(CodeActionKind::QUICKFIX),
                diagnostics: Some(params.context.diagnostics.clone()),
                edit: Some(WorkspaceEdit {
                    changes: Some(HashMap::from([(uri.clone(), edits)])),
                    ..Default::default()
                }),
                is_preferred: Some(i == 0),
                ..Default::default()
            })
        })
        .collect()
}
