//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `trytuple` binary and verify exit codes,
//! stdout content, and stderr content. Tests run from the workspace root
//! so the shared `fixtures/` directory resolves.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn trytuple() -> Command {
    let mut cmd = cargo_bin_cmd!("trytuple");
    cmd.current_dir(workspace_root());
    cmd
}

fn trytuple_in(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("trytuple");
    cmd.current_dir(dir);
    cmd
}

// ──────────────────────────────────────────────
// Help and usage
// ──────────────────────────────────────────────

#[test]
fn help_describes_the_tool() {
    trytuple()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[result, error]"));
}

#[test]
fn check_without_paths_is_a_usage_error() {
    trytuple().arg("check").assert().code(2);
}

#[test]
fn missing_path_exits_2() {
    trytuple()
        .args(["check", "fixtures/does-not-exist"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

// ──────────────────────────────────────────────
// check
// ──────────────────────────────────────────────

#[test]
fn clean_file_exits_0() {
    trytuple()
        .args(["check", "fixtures/clean.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checked 1 file: no problems found"));
}

#[test]
fn directory_reports_every_problem() {
    trytuple()
        .args(["check", "fixtures"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "fixtures/mixed.ts:20:9: error[54600]: tryCatch return value should be destructured as [result, error].",
        ))
        .stdout(predicate::str::contains("fixtures/nested/lib/jobs.ts:"))
        .stdout(predicate::str::contains("Checked 3 files: 7 error(s), 0 warning(s)"));
}

#[test]
fn flags_override_defaults() {
    trytuple()
        .args([
            "check",
            "fixtures/mixed.ts",
            "--allow-ignored-error",
            "false",
            "--check-wrapped-calls",
            "false",
            "--error-level",
            "warning",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("fixtures/mixed.ts:19:9: warning[54600]"))
        .stdout(predicate::str::contains("0 error(s), 5 warning(s)"));
}

#[test]
fn quiet_suppresses_the_summary() {
    trytuple()
        .args(["--quiet", "check", "fixtures/mixed.ts"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error[54600]"))
        .stdout(predicate::str::contains("Checked").not());
}

#[test]
fn json_output_carries_positions() {
    let output = trytuple()
        .args(["--output", "json", "check", "fixtures/mixed.ts"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["files_checked"], 1);
    assert_eq!(report["errors"], 6);
    assert_eq!(report["config"]["allowIgnoredError"], true);
    let first = &report["diagnostics"][0];
    assert_eq!(first["file"], "fixtures/mixed.ts");
    assert_eq!(first["line"], 20);
    assert_eq!(first["column"], 9);
    assert_eq!(first["code"], 54600);
    assert_eq!(first["source"], "trytuple-batch");
}

#[test]
fn parse_errors_are_reported_and_fail() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.ts"), "const [x] = tryCatch(f;\n").unwrap();
    trytuple_in(dir.path())
        .args(["check", "."])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error[1005]"));
}

#[test]
fn unreadable_file_does_not_hide_the_others() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.ts"), "const [r] = tryCatch(f);\n").unwrap();
    fs::write(dir.path().join("b.ts"), b"// caf\xe9\n").unwrap();
    trytuple_in(dir.path())
        .args(["check", "."])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("a.ts:1:7: error[54600]"))
        .stdout(predicate::str::contains("b.ts:1:1: error[5012]: cannot read file"))
        .stdout(predicate::str::contains("Checked 1 file: 2 error(s), 0 warning(s)"));
}

#[test]
fn jsx_sources_are_not_collected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("c.tsx"),
        "const el = <div className=\"a\">{x}</div>;\nconst [r] = tryCatch(f);\n",
    )
    .unwrap();
    fs::write(dir.path().join("d.ts"), "const [ok, err] = tryCatch(f);\n").unwrap();
    trytuple_in(dir.path())
        .args(["check", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("c.tsx").not())
        .stdout(predicate::str::contains("Checked 1 file: no problems found"));
}

// ──────────────────────────────────────────────
// Configuration file
// ──────────────────────────────────────────────

#[test]
fn config_file_is_discovered_and_flags_win() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("trytuple.toml"),
        "[options]\nerrorLevel = \"warning\"\nallowIgnoredError = false\n",
    )
    .unwrap();
    fs::write(dir.path().join("a.ts"), "const [v, ,] = tryCatch(load);\n").unwrap();

    trytuple_in(dir.path())
        .args(["check", "a.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.ts:1:7: warning[54600]"));

    trytuple_in(dir.path())
        .args(["check", "a.ts", "--error-level", "error"])
        .assert()
        .code(1);
}

#[test]
fn declared_types_mark_foreign_wrappers() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(
        &config,
        "[types.\"api.get\"]\ntracked = true\npromise = true\n",
    )
    .unwrap();
    fs::write(dir.path().join("a.ts"), "const [user] = await api.get(1);\n").unwrap();

    trytuple_in(dir.path())
        .args(["check", "a.ts", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("a.ts:1:7: error[54600]"));
}

#[test]
fn broken_config_exits_2() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("trytuple.toml"), "[options\n").unwrap();
    fs::write(dir.path().join("a.ts"), "let a;\n").unwrap();
    trytuple_in(dir.path())
        .args(["check", "a.ts"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("trytuple.toml"));
}

// ──────────────────────────────────────────────
// --fix
// ──────────────────────────────────────────────

#[test]
fn fix_rewrites_patterns_in_place() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.ts");
    fs::write(
        &file,
        "const [user] = tryCatch(load);\nconst whole = tryCatch(load);\nconst [ok, err] = tryCatch(load);\n",
    )
    .unwrap();

    trytuple_in(dir.path())
        .args(["check", "a.ts", "--fix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fixed 2 problem(s)"))
        .stdout(predicate::str::contains("no problems found"));

    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "const [user, error] = tryCatch(load);\nconst [whole, error] = tryCatch(load);\nconst [ok, err] = tryCatch(load);\n"
    );
}
