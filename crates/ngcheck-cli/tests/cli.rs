//! End-to-end runs of the `ngcheck` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn rule_fixture(rule: &str, name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../ngcheck-rules/tests/fixtures")
        .join(rule)
        .join(name)
}

/// A project directory holding one component copied from a rule fixture.
fn project_with(rule: &str, name: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::copy(
        rule_fixture(rule, name),
        dir.path().join("src/app.component.ts"),
    )
    .unwrap();
    dir
}

fn ngcheck(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ngcheck"))
        .args(args)
        .current_dir(dir)
        .env_remove("NGCHECK_CONFIG")
        .env_remove("RUST_LOG")
        .env("NGCHECK_CONFIG_DIR", dir.join(".no-global"))
        .output()
        .unwrap()
}

#[test]
fn empty_project_exits_clean() {
    let dir = TempDir::new().unwrap();
    let out = ngcheck(dir.path(), &["analyze"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn findings_exit_with_one() {
    let dir = project_with("memory-leak-subscription", "bad.component.ts");
    let out = ngcheck(dir.path(), &["analyze", "src"]);
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("memory-leak-subscription"), "{stdout}");
    assert!(!stdout.contains("\x1b["), "color written to a pipe");
}

#[test]
fn json_output_is_an_array_of_records() {
    let dir = project_with("memory-leak-subscription", "bad.component.ts");
    let out = ngcheck(
        dir.path(),
        &["analyze", "src", "--format", "json", "--rules", "NG101"],
    );
    let records: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let records = records.as_array().unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["rule"], "memory-leak-subscription");
    assert_eq!(records[0]["code"], "NG101");
    assert_eq!(records[0]["file"], "src/app.component.ts");
}

#[test]
fn restricted_rules_on_good_code_exit_clean() {
    let dir = project_with("memory-leak-subscription", "good.component.ts");
    let out = ngcheck(dir.path(), &["analyze", "--rules", "memory-leak-subscription"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));
}

#[test]
fn fail_on_raises_the_threshold() {
    let dir = project_with("missing-onpush", "bad.component.ts");
    let out = ngcheck(
        dir.path(),
        &["analyze", "--rules", "missing-onpush", "--fail-on", "error"],
    );
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("missing-onpush"));
}

#[test]
fn unknown_rule_is_a_setup_failure() {
    let dir = TempDir::new().unwrap();
    let out = ngcheck(dir.path(), &["analyze", "--rules", "no-such-rule"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no-such-rule"));
}

#[test]
fn duplicate_custom_rule_code_is_a_setup_failure() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("ngcheck.toml"),
        r#"
[[custom-rule]]
id = "no-document-write"
code = "NG101"
title = "document.write"
severity = "error"
fact = "dom-html-write"
"#,
    )
    .unwrap();
    let out = ngcheck(dir.path(), &["analyze"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn custom_rule_from_project_config_runs() {
    let dir = project_with("unsafe-inner-html", "bad.component.ts");
    fs::write(
        dir.path().join("ngcheck.toml"),
        r#"
only = ["X001"]

[[custom-rule]]
id = "any-dom-html-write"
code = "X001"
title = "HTML written to the DOM"
severity = "warning"
message = "HTML written through `{property}`"
fact = "dom-html-write"
"#,
    )
    .unwrap();
    let out = ngcheck(dir.path(), &["analyze", "src", "--format", "json"]);
    let records: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let records = records.as_array().unwrap();

    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r["code"] == "X001"));
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn init_then_analyze() {
    let dir = TempDir::new().unwrap();
    let out = ngcheck(dir.path(), &["init"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(dir.path().join("ngcheck.toml").is_file());

    let again = ngcheck(dir.path(), &["init"]);
    assert_eq!(again.status.code(), Some(2));

    let out = ngcheck(dir.path(), &["analyze"]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn list_rules_names_every_code() {
    let dir = TempDir::new().unwrap();
    let out = ngcheck(dir.path(), &["list-rules"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    for code in ["NG101", "NG111", "NG134", "NG171"] {
        assert!(stdout.contains(code), "{code} missing");
    }
}
