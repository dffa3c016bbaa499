//! Incremental (editor) integration.
//!
//! [`TupleCheckService`] decorates an upstream [`LanguageService`]: it
//! returns everything upstream returns and appends its own diagnostics and
//! fixes after them.

use crate::batch::ProgramHost;
use crate::codefix::{fixes_for_range, CodeFixAction};
use crate::config::PluginConfig;
use crate::diagnostic::{Diagnostic, SourceTag};
use crate::ERROR_CODE;

pub trait LanguageService {
    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic>;

    /// Fixes for `[start, end)` addressing any of `error_codes`.
    fn code_fixes_at(
        &self,
        file: &str,
        start: usize,
        end: usize,
        error_codes: &[u32],
    ) -> Vec<CodeFixAction>;

    /// The program behind the service, when one is loaded.
    fn program(&self) -> Option<&dyn ProgramHost>;
}

pub struct TupleCheckService<S> {
    upstream: S,
    config: PluginConfig,
}

impl<S: LanguageService> TupleCheckService<S> {
    pub fn new(upstream: S, config: PluginConfig) -> Self {
        tracing::info!(
            severity = config.severity.as_str(),
            allow_ignored_error = config.allow_ignored_error,
            check_wrapped_calls = config.check_wrapped_calls,
            "tuple check service loaded"
        );
        TupleCheckService { upstream, config }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn upstream(&self) -> &S {
        &self.upstream
    }

    pub fn upstream_mut(&mut self) -> &mut S {
        &mut self.upstream
    }
}

impl<S: LanguageService> LanguageService for TupleCheckService<S> {
    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        let mut diagnostics = self.upstream.semantic_diagnostics(file);
        let Some(program) = self.upstream.program() else {
            tracing::info!(file, "skipping visit: no program loaded");
            return diagnostics;
        };
        let Some(tree) = program.syntax_tree(file) else {
            tracing::info!(file, "skipping visit: source file not found");
            return diagnostics;
        };
        let Some(query) = program.type_query(file) else {
            tracing::info!(file, "skipping visit: type checker not available");
            return diagnostics;
        };
        let found = crate::check_file(
            tree,
            &*query,
            &self.config,
            SourceTag::Service,
            &mut diagnostics,
        );
        tracing::info!(file, found, "completed visit");
        diagnostics
    }

    fn code_fixes_at(
        &self,
        file: &str,
        start: usize,
        end: usize,
        error_codes: &[u32],
    ) -> Vec<CodeFixAction> {
        let mut fixes = self.upstream.code_fixes_at(file, start, end, error_codes);
        if !error_codes.is_empty() && !error_codes.contains(&ERROR_CODE) {
            return fixes;
        }
        let Some(program) = self.upstream.program() else {
            tracing::debug!(file, "no fixes: no program loaded");
            return fixes;
        };
        let Some(tree) = program.syntax_tree(file) else {
            tracing::debug!(file, "no fixes: source file not found");
            return fixes;
        };
        let Some(query) = program.type_query(file) else {
            tracing::debug!(file, "no fixes: type checker not available");
            return fixes;
        };
        fixes.extend(fixes_for_range(tree, &*query, start, end, &self.config));
        fixes
    }

    fn program(&self) -> Option<&dyn ProgramHost> {
        self.upstream.program()
    }
}
