mod common;

use assert_cmd::Command;
use common::{TestWorkspace, schema_yaml};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

fn bin() -> Command {
    Command::cargo_bin("sheet-migrate").expect("binary exists")
}

fn seeded_workspace() -> TestWorkspace {
    let workspace = TestWorkspace::new();
    workspace.write(
        "schema.yml",
        &schema_yaml("users", &[("id", "integer"), ("name", "string"), ("email", "string")]),
    );
    workspace.write_sheet("users", "id,name\n1,Ann\n");
    workspace
}

#[test]
fn init_writes_the_template_once() {
    let workspace = TestWorkspace::new();
    let schema = workspace.path().join("config").join("schema.yml");
    bin()
        .args(["init", schema.to_str().unwrap()])
        .assert()
        .success();
    let contents = std::fs::read_to_string(&schema).expect("template");
    assert!(contents.contains("example_table"));

    bin()
        .args(["init", schema.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("already exists"));
}

#[test]
fn plan_lists_pending_changes() {
    let workspace = seeded_workspace();
    bin()
        .current_dir(workspace.path())
        .args(["plan", "schema.yml"])
        .assert()
        .success()
        .stdout(contains("=== Schema Migration Plan ==="))
        .stdout(contains(
            "  + users.email: Add new field 'email' of type string at position 3",
        ))
        .stdout(contains("Run 'sheet-migrate apply'"));
}

#[test]
fn plan_emits_json() {
    let workspace = seeded_workspace();
    let output = bin()
        .args(["plan", "schema.yml", "--json", "--workbook"])
        .arg(workspace.path())
        .current_dir(workspace.path())
        .output()
        .expect("run plan");
    assert!(output.status.success());
    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(plans[0]["resource"], "users");
    assert_eq!(plans[0]["changes"][0]["type"], "ADD");
    assert_eq!(plans[0]["changes"][0]["field"]["name"], "email");
}

#[test]
fn apply_with_yes_updates_the_sheet() {
    let workspace = seeded_workspace();
    bin()
        .current_dir(workspace.path())
        .args(["apply", "schema.yml", "--yes"])
        .assert()
        .success()
        .stdout(contains("✓ users: Successfully applied 1 changes"));
    assert_eq!(workspace.read_sheet("users"), "id,name,email\n1,Ann,\n");

    bin()
        .current_dir(workspace.path())
        .args(["plan", "schema.yml"])
        .assert()
        .success()
        .stdout(contains("All resources are up to date"));
}

#[test]
fn apply_dry_run_leaves_the_sheet_alone() {
    let workspace = seeded_workspace();
    bin()
        .current_dir(workspace.path())
        .args(["apply", "schema.yml", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("DRY RUN: Would apply 1 changes"));
    assert_eq!(workspace.read_sheet("users"), "id,name\n1,Ann\n");
}

#[test]
fn declining_the_prompt_changes_nothing() {
    let workspace = seeded_workspace();
    bin()
        .current_dir(workspace.path())
        .args(["apply", "schema.yml"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(contains("Apply cancelled.").and(contains("[y/N]")));
    assert_eq!(workspace.read_sheet("users"), "id,name\n1,Ann\n");
}

#[test]
fn invalid_schema_fails_before_touching_the_workbook() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "schema.yml",
        &schema_yaml("users", &[("id", "integer")])
            .replace(common::LOCATOR, "https://example.com/no-id"),
    );
    bin()
        .current_dir(workspace.path())
        .args(["plan", "schema.yml"])
        .assert()
        .failure()
        .stderr(contains("store id not found"));
    assert!(!workspace.path().join("book").exists());
}
