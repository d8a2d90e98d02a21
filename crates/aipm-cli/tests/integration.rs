#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn aipm(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("aipm").unwrap();
    cmd.current_dir(dir.path())
        .env("AIPM_ROOT", dir.path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_REPO")
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

fn write(dir: &TempDir, rel: &str, text: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn plan(dir: &TempDir, feature: &str) {
    aipm(dir)
        .args(["prd", "new", feature, "--non-interactive"])
        .assert()
        .success();
    aipm(dir)
        .args(["prd", "parse", feature, "--non-interactive"])
        .assert()
        .success();
    aipm(dir)
        .args(["epic", "decompose", feature, "--non-interactive"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// aipm init / config
// ---------------------------------------------------------------------------

#[test]
fn init_creates_layout() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .aipm/config.yaml"));

    assert!(dir.path().join(".aipm/config.yaml").exists());
    assert!(dir.path().join(".claude/prds").is_dir());
    assert!(dir.path().join(".claude/epics").is_dir());
    assert!(dir.path().join(".env.example").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    aipm(&dir).arg("init").assert().success();
    aipm(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .aipm/config.yaml"));
}

#[test]
fn config_show_masks_secrets() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .args(["config", "show"])
        .env("GITHUB_TOKEN", "ghp_supersecret")
        .assert()
        .success()
        .stdout(predicate::str::contains("ghp_****"))
        .stdout(predicate::str::contains("supersecret").not())
        .stdout(predicate::str::contains("epics_dir: .claude/epics"));
}

#[test]
fn dotenv_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".env", "GITHUB_REPO=acme/app\n");
    aipm(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/app"));
}

// ---------------------------------------------------------------------------
// PRD → epic → tasks
// ---------------------------------------------------------------------------

#[test]
fn non_interactive_end_to_end() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .args(["prd", "new", "user-auth", "--non-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next: aipm prd parse user-auth"));

    let prd = read(&dir, ".claude/prds/user-auth.md");
    assert!(prd.starts_with("---\nname: user-auth\n"));
    assert!(prd.contains("status: backlog"));
    assert!(predicate::str::is_match(r"created: \d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z")
        .unwrap()
        .eval(&prd));

    aipm(&dir)
        .args(["prd", "parse", "user-auth", "--non-interactive"])
        .assert()
        .success();
    let epic = read(&dir, ".claude/epics/user-auth/epic.md");
    assert!(epic.contains("status: planning"));
    assert!(epic.contains("prd: .claude/prds/user-auth.md"));

    aipm(&dir)
        .args(["epic", "decompose", "user-auth", "--non-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next: aipm epic sync user-auth"));

    let first = read(&dir, ".claude/epics/user-auth/user-auth-task-01.md");
    assert!(first.contains("status: todo"));
    assert!(first.contains("depends_on: none"));
    let second = read(&dir, ".claude/epics/user-auth/user-auth-task-02.md");
    assert!(second.contains("depends_on: [user-auth-task-01]"));
    assert!(read(&dir, ".claude/epics/user-auth/epic.md").contains("## Generated Tasks"));
}

#[test]
fn json_output_replaces_summary() {
    let dir = TempDir::new().unwrap();
    let output = aipm(&dir)
        .args(["--json", "prd", "new", "demo", "--non-interactive"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["feature"], "demo");
}

#[test]
fn invalid_feature_name_fails() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .args(["prd", "new", "UserAuth", "--non-interactive"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("kebab-case"));
    assert!(!dir.path().join(".claude/prds").exists());
}

#[test]
fn parse_without_prd_fails() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .args(["prd", "parse", "ghost", "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PRD not found"));
}

#[test]
fn ai_mode_without_key_is_fatal() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .args(["prd", "new", "demo", "--ai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY is not set"));
}

#[test]
fn ai_and_non_interactive_conflict() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .args(["prd", "new", "demo", "--ai", "--non-interactive"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// Overwrite confirmation
// ---------------------------------------------------------------------------

#[test]
fn non_interactive_overwrites_existing_prd() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".claude/prds/demo.md", "old");
    aipm(&dir)
        .args(["prd", "new", "demo", "--non-interactive"])
        .assert()
        .success();
    assert!(read(&dir, ".claude/prds/demo.md").contains("status: backlog"));
}

#[test]
fn interactive_decline_keeps_existing_prd() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".claude/prds/demo.md", "old");
    aipm(&dir)
        .args(["prd", "new", "demo"])
        .write_stdin("n\n")
        .assert()
        .failure();
    assert_eq!(read(&dir, ".claude/prds/demo.md"), "old");
}

#[test]
fn interactive_answers_are_written() {
    let dir = TempDir::new().unwrap();
    aipm(&dir)
        .args(["prd", "new", "demo"])
        .write_stdin("Self-serve demo accounts\nSales spends hours on demos\n\n\n\n\n\n\n\n\n\n")
        .assert()
        .success();
    let prd = read(&dir, ".claude/prds/demo.md");
    assert!(prd.contains("description: Self-serve demo accounts"));
    assert!(prd.contains("Sales spends hours on demos"));
}

// ---------------------------------------------------------------------------
// Status / close
// ---------------------------------------------------------------------------

#[test]
fn epic_status_lists_tasks() {
    let dir = TempDir::new().unwrap();
    plan(&dir, "shop");
    aipm(&dir)
        .args(["epic", "status", "shop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress: 0% (0/5 closed)"))
        .stdout(predicate::str::contains("shop-task-05.md"));
}

#[test]
fn epic_close_refuses_open_tasks() {
    let dir = TempDir::new().unwrap();
    plan(&dir, "shop");
    aipm(&dir)
        .args(["epic", "close", "shop", "all", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tasks still open"));
    assert!(read(&dir, ".claude/epics/shop/epic.md").contains("status: planning"));
}

#[test]
fn sync_without_credentials_fails() {
    let dir = TempDir::new().unwrap();
    plan(&dir, "shop");
    aipm(&dir)
        .args(["epic", "sync", "shop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN is not set"));
}

fn seed_synced_epic(dir: &TempDir, api_url: &str) {
    write(
        dir,
        ".aipm/config.yaml",
        &format!("version: 1\ntracker:\n  api_url: {api_url}\n"),
    );
    write(
        dir,
        ".claude/epics/shop/epic.md",
        "---\nname: shop\nstatus: planning\ncreated: 2024-01-01T00:00:00Z\nprogress: 0%\n---\n\n# shop\n",
    );
    for n in 1..=3 {
        write(
            dir,
            &format!(".claude/epics/shop/{n}.md"),
            &format!("---\nname: Task {n}\nstatus: open\ngithub_issue_number: {n}\n---\n\n# Task {n}\n"),
        );
    }
}

#[test]
fn issue_close_updates_task_epic_and_github() {
    let mut server = mockito::Server::new();
    let comment = server
        .mock("POST", "/repos/acme/app/issues/2/comments")
        .match_body(mockito::Matcher::Regex("Completion notes: shipped".to_string()))
        .with_status(201)
        .with_body(r#"{"id": 1}"#)
        .create();
    let close = server
        .mock("PATCH", "/repos/acme/app/issues/2")
        .match_body(mockito::Matcher::PartialJsonString(r#"{"state":"closed"}"#.to_string()))
        .with_status(200)
        .with_body(
            r#"{"number": 2, "title": "Task 2", "state": "closed", "labels": [],
                "html_url": "https://github.com/acme/app/issues/2"}"#,
        )
        .create();

    let dir = TempDir::new().unwrap();
    seed_synced_epic(&dir, &server.url());
    aipm(&dir)
        .args(["issue", "close", "2", "shipped"])
        .env("GITHUB_TOKEN", "ghp_test")
        .env("GITHUB_REPO", "acme/app")
        .assert()
        .success()
        .stdout(predicate::str::contains("shop at 33%"));

    comment.assert();
    close.assert();
    assert!(read(&dir, ".claude/epics/shop/2.md").contains("status: closed"));
    assert!(read(&dir, ".claude/epics/shop/epic.md").contains("progress: 33%"));
}

#[test]
fn issue_close_reports_github_failure() {
    let mut server = mockito::Server::new();
    let _comment = server
        .mock("POST", "/repos/acme/app/issues/1/comments")
        .with_status(500)
        .with_body(r#"{"message": "boom"}"#)
        .create();

    let dir = TempDir::new().unwrap();
    seed_synced_epic(&dir, &server.url());
    aipm(&dir)
        .args(["issue", "close", "1"])
        .env("GITHUB_TOKEN", "ghp_test")
        .env("GITHUB_REPO", "acme/app")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("HTTP 500"));
    assert!(read(&dir, ".claude/epics/shop/1.md").contains("status: closed"));
}

#[test]
fn issue_close_unknown_number_fails() {
    let dir = TempDir::new().unwrap();
    seed_synced_epic(&dir, "http://127.0.0.1:9");
    aipm(&dir)
        .args(["issue", "close", "77"])
        .env("GITHUB_TOKEN", "ghp_test")
        .env("GITHUB_REPO", "acme/app")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no local task file found for issue #77"));
}

// ---------------------------------------------------------------------------
// aipm doc
// ---------------------------------------------------------------------------

#[test]
fn doc_validate_reports_missing_fields() {
    let dir = TempDir::new().unwrap();
    write(&dir, "doc.md", "---\nname: x\nstatus: backlog\n---\n\n## Overview\nHello\n## Next\nWorld\n");
    let path = dir.path().join("doc.md");

    aipm(&dir)
        .args(["doc", "validate"])
        .arg(&path)
        .args(["--require", "name,status,created"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("created"));

    aipm(&dir)
        .args(["doc", "validate"])
        .arg(&path)
        .args(["--require", "name,status"])
        .assert()
        .success();
}

#[test]
fn doc_validate_without_frontmatter_fails() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plain.md", "# Just text\n");
    aipm(&dir)
        .args(["doc", "validate"])
        .arg(dir.path().join("plain.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no frontmatter"));
}

#[test]
fn doc_section_and_field() {
    let dir = TempDir::new().unwrap();
    write(&dir, "doc.md", "---\nname: x\nstatus: backlog\n---\n\n## Overview\nHello\n## Next\nWorld\n");
    let path: &Path = &dir.path().join("doc.md");

    aipm(&dir)
        .args(["doc", "section"])
        .arg(path)
        .arg("Overview")
        .assert()
        .success()
        .stdout("Hello\n");

    aipm(&dir)
        .args(["doc", "section"])
        .arg(path)
        .arg("Missing")
        .assert()
        .failure();

    aipm(&dir)
        .args(["doc", "field"])
        .arg(path)
        .arg("status")
        .assert()
        .success()
        .stdout("backlog\n");
}
