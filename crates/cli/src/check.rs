//! `trytuple check`: batch-check files and directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use trytuple_analyze::{
    apply_edits, fixes_for_range, run_batch, CheckReport, Diagnostic, DiagnosticSink,
    LanguageService, PluginConfig, PluginConfigBuilder, ProgramHost, Project, ProjectConfig,
    Severity, TextEdit, ERROR_CODE,
};
use trytuple_core::{FileSystemProvider, SourceProvider};

use crate::{report_error, ErrorLevel, OutputFormat};

const DEFAULT_CONFIG_FILE: &str = "trytuple.toml";

const EXIT_CLEAN: i32 = 0;
const EXIT_PROBLEMS: i32 = 1;
const EXIT_USAGE: i32 = 2;

pub(crate) struct CheckOptions<'a> {
    pub paths: &'a [PathBuf],
    pub config: Option<&'a Path>,
    pub error_level: Option<ErrorLevel>,
    pub allow_ignored_error: Option<bool>,
    pub check_wrapped_calls: Option<bool>,
    pub fix: bool,
    pub output: OutputFormat,
    pub quiet: bool,
}

/// Run the check and return the process exit code.
pub(crate) fn cmd_check(opts: CheckOptions<'_>) -> i32 {
    let project_config = match load_config(opts.config) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, opts.output, opts.quiet);
            return EXIT_USAGE;
        }
    };
    let sources = match collect_sources(opts.paths) {
        Ok(s) => s,
        Err(msg) => {
            report_error(&msg, opts.output, opts.quiet);
            return EXIT_USAGE;
        }
    };
    let config = effective_config(&project_config, &opts);

    let mut project = Project::with_declared_types(project_config.declared_types());
    let mut paths = BTreeMap::new();
    for (name, (path, text)) in sources {
        match text {
            Ok(text) => {
                project.set_file(&name, text);
                paths.insert(name, path);
            }
            Err(reason) => project.set_unreadable(&name, reason),
        }
    }

    let mut fixed = 0;
    if opts.fix {
        fixed = match apply_fixes(&mut project, &paths, &config) {
            Ok(n) => n,
            Err(msg) => {
                report_error(&msg, opts.output, opts.quiet);
                return EXIT_USAGE;
            }
        };
    }

    let report = run_check(&project, config);
    print_report(&report, &project, fixed, &opts);
    if report.has_errors() {
        EXIT_PROBLEMS
    } else {
        EXIT_CLEAN
    }
}

/// Explicit `--config`, else `./trytuple.toml` when present, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig, String> {
    let path = match explicit {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
        None => return Ok(ProjectConfig::default()),
    };
    tracing::debug!(path = %path.display(), "loading configuration");
    ProjectConfig::load(path).map_err(|e| e.to_string())
}

/// File values first, then command-line overrides.
fn effective_config(project_config: &ProjectConfig, opts: &CheckOptions<'_>) -> PluginConfig {
    let mut builder = PluginConfigBuilder::from_config(project_config.plugin_config());
    if let Some(level) = opts.error_level {
        builder = builder.severity(match level {
            ErrorLevel::Error => Severity::Error,
            ErrorLevel::Warning => Severity::Warning,
        });
    }
    if let Some(allow) = opts.allow_ignored_error {
        builder = builder.allow_ignored_error(allow);
    }
    if let Some(check) = opts.check_wrapped_calls {
        builder = builder.check_wrapped_calls(check);
    }
    builder.build()
}

type Sources = BTreeMap<String, (PathBuf, Result<String, String>)>;

/// Display name -> (path on disk, text or read failure), deduplicated
/// across roots. A root that cannot be listed is a usage error; a file
/// that cannot be read is kept and reported like a parse failure.
fn collect_sources(roots: &[PathBuf]) -> Result<Sources, String> {
    let provider = FileSystemProvider;
    let mut sources = BTreeMap::new();
    for root in roots {
        let files = provider
            .collect_sources(root)
            .map_err(|e| format!("cannot read {}: {}", root.display(), e))?;
        for path in files {
            let text = provider.read_source(&path).map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "unreadable source");
                e.to_string()
            });
            let name = path.to_string_lossy().replace('\\', "/");
            sources.insert(name, (path, text));
        }
    }
    Ok(sources)
}

/// Host parse failures plus the batch checker's findings.
fn run_check(project: &Project, config: PluginConfig) -> CheckReport {
    let mut report = CheckReport::new(config);
    for file in project.file_names() {
        for diagnostic in project.semantic_diagnostics(&file) {
            report.report(diagnostic);
        }
    }
    let summary = run_batch(project, &config, &mut report);
    report.record_batch(&summary);
    report.sort();
    report
}

/// Apply the preferred fix for every finding and write the files back.
/// Returns the number of patterns rewritten.
fn apply_fixes(
    project: &mut Project,
    paths: &BTreeMap<String, PathBuf>,
    config: &PluginConfig,
) -> Result<usize, String> {
    let findings = run_check(project, *config);
    let mut edits_by_file: BTreeMap<String, Vec<TextEdit>> = BTreeMap::new();
    for diagnostic in findings.diagnostics.iter().filter(|d| d.code == ERROR_CODE) {
        let (Some(tree), Some(query)) = (
            project.syntax_tree(&diagnostic.file),
            project.type_query(&diagnostic.file),
        ) else {
            continue;
        };
        let preferred = fixes_for_range(tree, &*query, diagnostic.start, diagnostic.end(), config)
            .into_iter()
            .next();
        if let Some(fix) = preferred {
            edits_by_file
                .entry(diagnostic.file.clone())
                .or_default()
                .extend(fix.edits);
        }
    }

    let mut fixed = 0;
    for (file, edits) in edits_by_file {
        let (Some(text), Some(path)) = (project.file_text(&file), paths.get(&file)) else {
            continue;
        };
        let updated = apply_edits(text, &edits);
        std::fs::write(path, &updated)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        tracing::info!(file = %file, edits = edits.len(), "applied fixes");
        fixed += edits.len();
        project.set_file(&file, updated);
    }
    Ok(fixed)
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
    line: usize,
    column: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    config: &'a PluginConfig,
    files_checked: usize,
    files_skipped: usize,
    errors: usize,
    warnings: usize,
    fixed: usize,
    diagnostics: Vec<JsonDiagnostic<'a>>,
}

fn print_report(report: &CheckReport, project: &Project, fixed: usize, opts: &CheckOptions<'_>) {
    match opts.output {
        OutputFormat::Json => {
            let diagnostics = report
                .diagnostics
                .iter()
                .map(|d| {
                    let (line, column) = line_column(project.file_text(&d.file), d.start);
                    JsonDiagnostic {
                        diagnostic: d,
                        line,
                        column,
                    }
                })
                .collect();
            let json = JsonReport {
                config: &report.config,
                files_checked: report.files_checked,
                files_skipped: report.files_skipped,
                errors: report.errors,
                warnings: report.warnings,
                fixed,
                diagnostics,
            };
            let text = serde_json::to_string_pretty(&json)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", text);
        }
        OutputFormat::Text => {
            for d in &report.diagnostics {
                let (line, column) = line_column(project.file_text(&d.file), d.start);
                println!(
                    "{}:{}:{}: {}[{}]: {}",
                    d.file,
                    line,
                    column,
                    d.severity.as_str(),
                    d.code,
                    d.message
                );
            }
            if !opts.quiet {
                if fixed > 0 {
                    println!("Fixed {} problem(s)", fixed);
                }
                println!("{}", report.summary_line());
            }
        }
    }
}

/// 1-based line and character column of `offset`.
fn line_column(text: Option<&str>, offset: usize) -> (usize, usize) {
    let Some(text) = text else {
        return (1, 1);
    };
    let before = text.get(..offset).unwrap_or(text);
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let line = before.matches('\n').count() + 1;
    (line, before[line_start..].chars().count() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_counts_characters() {
        let text = "let a;\nconst é = [x];";
        assert_eq!(line_column(Some(text), 0), (1, 1));
        let at = text.find('[').unwrap();
        assert_eq!(line_column(Some(text), at), (2, 11));
        assert_eq!(line_column(None, 5), (1, 1));
    }
}
