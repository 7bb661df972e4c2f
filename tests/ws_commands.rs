mod support;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::{json, Value};

use support::TestProject;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn tmw_cmd(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("tmw").expect("binary");
    cmd.current_dir(project.path())
        .env_remove("TMW_ROOT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn create_list_switch_flow() -> TestResult {
    let project = TestProject::init()?;

    tmw_cmd(&project)
        .args(["create", "alpha", "Alpha", "work"])
        .assert()
        .success()
        .stdout(contains("✅ Created workspace: alpha"));
    tmw_cmd(&project).args(["create", "beta"]).assert().success();

    tmw_cmd(&project)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("alpha").and(contains("Alpha work")).and(contains("beta")));

    tmw_cmd(&project)
        .args(["switch", "beta"])
        .assert()
        .success()
        .stdout(contains("✅ Switched to workspace: beta"));

    tmw_cmd(&project)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("➤ beta [CURRENT]"));
    tmw_cmd(&project)
        .arg("current")
        .assert()
        .success()
        .stdout(contains("📍 Current workspace: beta"));

    let config = project.read_json(".taskmaster/config.json")?;
    assert_eq!(config["workspaces"]["current"], "beta");
    assert_eq!(config["workspaces"]["available"]["alpha"]["name"], "Alpha work");
    Ok(())
}

#[test]
fn list_json_reports_workspaces() -> TestResult {
    let project = TestProject::init()?;
    tmw_cmd(&project).args(["create", "alpha"]).assert().success();

    let output = tmw_cmd(&project).args(["list", "--json"]).output()?;
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["schema_version"], "tmw.v1");
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"][0]["name"], "alpha");
    assert_eq!(value["data"][0]["current"], false);
    assert_eq!(value["data"][0]["stats"]["totalTasks"], 0);
    Ok(())
}

#[test]
fn duplicate_create_reports_error_and_exits_zero() -> TestResult {
    let project = TestProject::init()?;
    tmw_cmd(&project).args(["create", "alpha"]).assert().success();
    let before = project.read_bytes(".taskmaster/config.json")?;

    tmw_cmd(&project)
        .args(["create", "alpha"])
        .assert()
        .code(0)
        .stderr(contains("Workspace 'alpha' already exists"));

    assert_eq!(project.read_bytes(".taskmaster/config.json")?, before);
    Ok(())
}

#[test]
fn switch_unknown_reports_not_found() -> TestResult {
    let project = TestProject::init()?;

    let output = tmw_cmd(&project).args(["switch", "ghost", "--json"]).output()?;
    assert_eq!(output.status.code(), Some(0));

    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["kind"], "not_found");
    assert_eq!(value["error"]["recoverable"], true);
    Ok(())
}

#[test]
fn delete_default_is_refused() -> TestResult {
    let project = TestProject::init()?;
    project.write_legacy_tasks(json!([]))?;
    tmw_cmd(&project).args(["create", "alpha"]).assert().success();

    tmw_cmd(&project)
        .args(["delete", "default"])
        .assert()
        .code(0)
        .stderr(contains("Cannot delete default workspace"));
    assert!(project.archived()?.is_empty());
    Ok(())
}

#[test]
fn delete_archives_workspace() -> TestResult {
    let project = TestProject::init()?;
    tmw_cmd(&project).args(["create", "alpha"]).assert().success();

    tmw_cmd(&project)
        .args(["delete", "alpha"])
        .assert()
        .success()
        .stdout(contains("✅ Archived workspace: alpha"));

    let archived = project.archived()?;
    assert_eq!(archived.len(), 1);
    assert!(archived[0].starts_with("alpha_"));
    Ok(())
}

#[test]
fn missing_state_dir_is_fatal() -> TestResult {
    let project = TestProject::uninitialized()?;

    tmw_cmd(&project)
        .arg("list")
        .assert()
        .code(2)
        .stderr(contains("not initialized"));
    assert!(!project.state_dir().exists());
    Ok(())
}

#[test]
fn corrupt_config_is_fatal() -> TestResult {
    let project = TestProject::init()?;
    project.write_file(".taskmaster/config.json", "[1, 2")?;

    tmw_cmd(&project)
        .args(["create", "alpha"])
        .assert()
        .code(2)
        .stderr(contains("Corrupt state file"));
    assert_eq!(project.read_bytes(".taskmaster/config.json")?, b"[1, 2");
    assert!(!project.state_dir().join("workspaces/alpha").exists());
    Ok(())
}

#[test]
fn root_flag_and_env_select_project() -> TestResult {
    let project = TestProject::init()?;
    let elsewhere = tempfile::tempdir()?;

    Command::cargo_bin("tmw")?
        .current_dir(elsewhere.path())
        .arg("--root")
        .arg(project.path())
        .args(["create", "alpha"])
        .assert()
        .success();

    Command::cargo_bin("tmw")?
        .current_dir(elsewhere.path())
        .env("TMW_ROOT", project.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("alpha"));
    Ok(())
}

#[test]
fn tasks_and_stats_show_workspace_contents() -> TestResult {
    let project = TestProject::init()?;
    project.write_legacy_tasks(json!([
        { "id": 1, "title": "Ship it", "status": "done" },
        { "id": 2, "title": "Plan it", "status": "pending", "description": "soon" }
    ]))?;
    tmw_cmd(&project).args(["create", "alpha"]).assert().success();

    tmw_cmd(&project)
        .arg("tasks")
        .assert()
        .success()
        .stdout(contains("✅ [1] Ship it (done)").and(contains("⏳ [2] Plan it (pending)\n   soon")));

    tmw_cmd(&project)
        .arg("stats")
        .assert()
        .success()
        .stdout(contains("📂 default:").and(contains("Total tasks: 2")).and(contains("📂 alpha:")));
    Ok(())
}

#[test]
fn menu_runs_from_stdin() -> TestResult {
    let project = TestProject::init()?;

    tmw_cmd(&project)
        .arg("menu")
        .write_stdin("4\nalpha\n\n\n2\n\n8\n")
        .assert()
        .success()
        .stdout(contains("✅ Created workspace: alpha").and(contains("👋 Goodbye!")));

    let config = project.read_json(".taskmaster/config.json")?;
    assert_eq!(config["workspaces"]["available"]["alpha"]["name"], "alpha");
    Ok(())
}
