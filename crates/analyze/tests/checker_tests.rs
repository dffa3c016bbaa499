//! Integration tests for the tuple-destructuring checker.
//!
//! Small inline programs cover the decision table and the quick fixes;
//! the shared fixtures under `fixtures/` cover whole files.

use std::path::{Path, PathBuf};

use trytuple_analyze::{
    apply_edits, run_batch, CodeFixAction, Diagnostic, LanguageService, PluginConfig, ProgramHost,
    Project, TupleCheckService, TypeQuery, TypeQueryError, TypeShape, ERROR_CODE, ERROR_MESSAGE,
};
use trytuple_core::{NodeId, SyntaxTree};

/// Locate the workspace root.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn service_for(src: &str, config: PluginConfig) -> TupleCheckService<Project> {
    let mut project = Project::new();
    project.set_file("main.ts", src);
    TupleCheckService::new(project, config)
}

fn diagnostics(src: &str, config: PluginConfig) -> Vec<Diagnostic> {
    service_for(src, config).semantic_diagnostics("main.ts")
}

/// Source text each diagnostic points at.
fn flagged<'a>(src: &'a str, diags: &[Diagnostic]) -> Vec<&'a str> {
    diags.iter().map(|d| &src[d.start..d.end()]).collect()
}

fn fixes_at(src: &str, config: PluginConfig, diag: &Diagnostic) -> Vec<CodeFixAction> {
    service_for(src, config).code_fixes_at("main.ts", diag.start, diag.end(), &[ERROR_CODE])
}

fn all_configs() -> Vec<PluginConfig> {
    let mut configs = Vec::new();
    for allow in [true, false] {
        for wrapped in [true, false] {
            configs.push(
                PluginConfig::builder()
                    .allow_ignored_error(allow)
                    .check_wrapped_calls(wrapped)
                    .build(),
            );
        }
    }
    configs
}

fn fixture_project(files: &[&str]) -> Project {
    let mut project = Project::new();
    for file in files {
        let text = std::fs::read_to_string(workspace_root().join("fixtures").join(file))
            .unwrap_or_else(|e| panic!("cannot read fixture {}: {}", file, e));
        project.set_file(file, text);
    }
    project
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn bound_error_slot_is_clean() {
    let src = "const [user, error] = tryCatch(parse(json));";
    assert!(diagnostics(src, PluginConfig::default()).is_empty());
}

#[test]
fn single_element_is_flagged_with_two_fixes() {
    let src = "const [user] = tryCatch(parse(json));";
    let diags = diagnostics(src, PluginConfig::default());
    assert_eq!(diags.len(), 1);
    assert_eq!(flagged(src, &diags), vec!["[user]"]);
    assert_eq!(diags[0].message, ERROR_MESSAGE);
    assert_eq!(diags[0].code, ERROR_CODE);

    let fixes = fixes_at(src, PluginConfig::default(), &diags[0]);
    let rewritten: Vec<String> = fixes.iter().map(|f| apply_edits(src, &f.edits)).collect();
    assert_eq!(
        rewritten,
        vec![
            "const [user, error] = tryCatch(parse(json));",
            "const [user, ,] = tryCatch(parse(json));",
        ]
    );
}

#[test]
fn omitted_slot_flagged_when_disallowed_and_only_fix_a_offered() {
    let src = "const [user, ,] = tryCatch(load());";
    let strict = PluginConfig::builder().allow_ignored_error(false).build();
    let diags = diagnostics(src, strict);
    assert_eq!(flagged(src, &diags), vec!["[user, ,]"]);
    let fixes = fixes_at(src, strict, &diags[0]);
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].edits[0].new_text, "[user, error]");

    assert!(diagnostics(src, PluginConfig::default()).is_empty());
}

#[test]
fn plain_binding_uses_its_name_in_fixes() {
    let src = "const result = tryCatch(() => null);";
    let diags = diagnostics(src, PluginConfig::default());
    assert_eq!(flagged(src, &diags), vec!["result"]);
    let fixes = fixes_at(src, PluginConfig::default(), &diags[0]);
    let texts: Vec<&str> = fixes.iter().map(|f| f.edits[0].new_text.as_str()).collect();
    assert_eq!(texts, vec!["[result, error]", "[result, ,]"]);
}

#[test]
fn wrapper_calls_follow_check_wrapped_calls() {
    let src = "function wrap() {\n  return tryCatch(() => compute());\n}\nconst [x] = wrap();";
    let on = diagnostics(src, PluginConfig::default());
    assert_eq!(flagged(src, &on), vec!["[x]"]);
    let off = PluginConfig::builder().check_wrapped_calls(false).build();
    assert!(diagnostics(src, off).is_empty());
}

// ──────────────────────────────────────────────
// Properties
// ──────────────────────────────────────────────

#[test]
fn bound_second_slot_is_valid_under_every_config() {
    for config in all_configs() {
        for src in [
            "const [a, b] = tryCatch(f);",
            "const [a, { message }] = tryCatch(f);",
            "const [, err] = tryCatch(f);",
            "const [a, err = null] = await tryCatch(f);",
        ] {
            assert!(diagnostics(src, config).is_empty(), "{} under {:?}", src, config);
        }
    }
}

#[test]
fn short_or_plain_patterns_are_invalid_under_every_config() {
    for config in all_configs() {
        for src in [
            "const [a] = tryCatch(f);",
            "const a = tryCatch(f);",
            "let [] = tryCatch(f);",
        ] {
            assert_eq!(diagnostics(src, config).len(), 1, "{} under {:?}", src, config);
        }
    }
}

#[test]
fn untracked_initializers_never_diagnose() {
    for config in all_configs() {
        for src in [
            "const [a] = compute();",
            "const a = [1, 2];",
            "const [a] = await fetchIt;",
            "const { a } = other(tryCatch(f));",
            "const [a] = new TryCatch();",
            "let a;",
        ] {
            assert!(diagnostics(src, config).is_empty(), "{} under {:?}", src, config);
        }
    }
}

#[test]
fn checking_is_idempotent() {
    let project = fixture_project(&["mixed.ts"]);
    let service = TupleCheckService::new(project, PluginConfig::default());
    let first = service.semantic_diagnostics("mixed.ts");
    let second = service.semantic_diagnostics("mixed.ts");
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn every_offered_fix_resolves_its_diagnostic() {
    let text = std::fs::read_to_string(workspace_root().join("fixtures/mixed.ts")).unwrap();
    for config in all_configs() {
        let diags = diagnostics(&text, config);
        for diag in &diags {
            let fixes = fixes_at(&text, config, diag);
            assert!(!fixes.is_empty(), "no fix for {}", &text[diag.start..diag.end()]);
            for fix in fixes {
                let fixed = apply_edits(&text, &fix.edits);
                let after = diagnostics(&fixed, config);
                assert_eq!(
                    after.len(),
                    diags.len() - 1,
                    "{} did not resolve {}",
                    fix.fix_name,
                    &text[diag.start..diag.end()]
                );
                assert!(after.iter().all(|d| d.start != diag.start));
            }
        }
    }
}

// ──────────────────────────────────────────────
// Failing type queries
// ──────────────────────────────────────────────

struct BrokenChecker;

impl TypeQuery for BrokenChecker {
    fn type_of(&self, _: &SyntaxTree, _: NodeId) -> Result<TypeShape, TypeQueryError> {
        Err(TypeQueryError::Failed("inconsistent tree".into()))
    }
}

/// A project whose type checker throws for every query.
struct BrokenTypes(Project);

impl ProgramHost for BrokenTypes {
    fn file_names(&self) -> Vec<String> {
        self.0.file_names()
    }

    fn syntax_tree(&self, file: &str) -> Option<&SyntaxTree> {
        self.0.syntax_tree(file)
    }

    fn type_query(&self, _: &str) -> Option<Box<dyn TypeQuery + '_>> {
        Some(Box::new(BrokenChecker))
    }
}

#[test]
fn failed_type_queries_fall_back_to_silence() {
    let src = "const wrap = () => tryCatch(f);\nconst [a] = wrap();\nconst [b] = tryCatch(f);";
    let mut project = Project::new();
    project.set_file("main.ts", src);
    let host = BrokenTypes(project);

    let mut sink: Vec<Diagnostic> = Vec::new();
    let summary = run_batch(&host, &PluginConfig::default(), &mut sink);
    assert_eq!(summary.files_checked, 1);
    assert_eq!(flagged(src, &sink), vec!["[b]"]);
}

// ──────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────

#[test]
fn mixed_fixture_default_config() {
    let project = fixture_project(&["mixed.ts"]);
    let text = project.file_text("mixed.ts").unwrap().to_string();
    let mut sink: Vec<Diagnostic> = Vec::new();
    run_batch(&project, &PluginConfig::default(), &mut sink);
    assert_eq!(
        flagged(&text, &sink),
        vec!["[first]", "whole", "[parsed]", "[remote]", "{ 0: left }", "[a, b, c]"]
    );
    assert!(sink.iter().all(|d| d.source == "trytuple-batch"));
}

#[test]
fn mixed_fixture_strict_and_unwrapped() {
    let project = fixture_project(&["mixed.ts"]);
    let text = project.file_text("mixed.ts").unwrap().to_string();

    let strict = PluginConfig::builder().allow_ignored_error(false).build();
    let mut sink: Vec<Diagnostic> = Vec::new();
    run_batch(&project, &strict, &mut sink);
    assert_eq!(flagged(&text, &sink)[0], "[cached, ,]");
    assert_eq!(sink.len(), 7);

    let direct_only = PluginConfig::builder().check_wrapped_calls(false).build();
    let mut sink: Vec<Diagnostic> = Vec::new();
    run_batch(&project, &direct_only, &mut sink);
    assert_eq!(
        flagged(&text, &sink),
        vec!["[first]", "whole", "{ 0: left }", "[a, b, c]"]
    );
}

#[test]
fn clean_and_class_fixtures() {
    let project = fixture_project(&["clean.ts", "nested/lib/jobs.ts"]);
    let service = TupleCheckService::new(project, PluginConfig::default());
    assert!(service.semantic_diagnostics("clean.ts").is_empty());
    let jobs = service.semantic_diagnostics("nested/lib/jobs.ts");
    assert_eq!(jobs.len(), 1);
    let text = service.upstream().file_text("nested/lib/jobs.ts").unwrap();
    assert_eq!(&text[jobs[0].start..jobs[0].end()], "[job]");
}
