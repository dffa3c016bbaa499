//! trytuple static checker -- enforces `[result, error]` destructuring of
//! values produced by `tryCatch`.
//!
//! The checker walks one [`SyntaxTree`] at a time. Eligible variable
//! declarations whose initializer is a tracked call (a direct `tryCatch`
//! call, or any call whose static type is the branded two-slot result) must
//! bind exactly two array-pattern positions. Violations become
//! [`Diagnostic`]s; [`codefix`] derives the textual repairs.
//!
//! Hosts plug in through [`service::TupleCheckService`] (incremental,
//! editor style) or [`batch::run_batch`] (whole program). [`project::Project`]
//! is the in-memory host used by the CLI, the language server and tests.

pub mod batch;
pub mod codefix;
pub mod config;
pub mod diagnostic;
pub mod infer;
pub mod oracle;
pub mod project;
pub mod report;
pub mod service;
pub mod types;
pub mod validator;
pub mod visitor;

pub use batch::{run_batch, BatchSummary, ProgramHost};
pub use codefix::{apply_edits, fixes_for_range, CodeFixAction, TextEdit};
pub use config::{resolve, ConfigError, PluginConfig, PluginConfigBuilder, ProjectConfig, Severity};
pub use diagnostic::{Diagnostic, DiagnosticSink, SourceTag};
pub use infer::InferredTypes;
pub use oracle::{is_tracked_result_type, TypeOracle};
pub use project::Project;
pub use report::CheckReport;
pub use service::{LanguageService, TupleCheckService};
pub use types::{DeclaredTypes, LayeredTypes, TypeQuery, TypeQueryError, TypeShape};
pub use validator::{classify_pattern, PatternVerdict, Validator};
pub use visitor::{eligible_declarations, CandidateSite};

use trytuple_core::SyntaxTree;

/// Diagnostic code reported for every badly destructured result.
pub const ERROR_CODE: u32 = 54600;

pub const ERROR_MESSAGE: &str = "tryCatch return value should be destructured as [result, error].";

/// Marker member carried by the branded result type.
pub const BRAND_MEMBER: &str = "__tryCatchTupleResult";

/// Name of the conversion function whose calls are always tracked.
pub const CONVERSION_FUNCTION: &str = "tryCatch";

/// Check every eligible declaration in `tree`, reporting violations to
/// `sink`. Returns the number of diagnostics reported.
pub fn check_file(
    tree: &SyntaxTree,
    query: &dyn TypeQuery,
    config: &PluginConfig,
    source: SourceTag,
    sink: &mut dyn DiagnosticSink,
) -> usize {
    let mut validator = Validator::new(config, TypeOracle::new(query), source);
    eligible_declarations(tree)
        .map(|site| validator.validate(tree, &site, sink))
        .filter(|reported| *reported)
        .count()
}
