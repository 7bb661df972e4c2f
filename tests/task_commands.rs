#![cfg(unix)]

mod support;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::{json, Value};

use support::TestProject;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Copies `$TMW_FIXTURE` over the file passed after `--file`
const ADD_SCRIPT: &str = r#"for a in "$@"; do if [ "$prev" = --file ]; then f="$a"; fi; prev="$a"; done; cp "$TMW_FIXTURE" "$f"; echo "engine: $1""#;

fn tmw_cmd(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("tmw").expect("binary");
    cmd.current_dir(project.path())
        .env_remove("TMW_ROOT")
        .env_remove("RUST_LOG");
    cmd
}

fn use_script_engine(project: &TestProject, script: &str) -> std::io::Result<()> {
    let config = format!(
        "[engine]\nprogram = \"sh\"\nargs = ['-c', '{script}', 'engine']\ntimeout_secs = 30\n"
    );
    project.write_file(".tmw.toml", &config)?;
    Ok(())
}

fn setup() -> Result<TestProject, Box<dyn std::error::Error>> {
    let project = TestProject::init()?;
    tmw_cmd(&project).args(["create", "alpha"]).assert().success();
    tmw_cmd(&project).args(["switch", "alpha"]).assert().success();
    Ok(project)
}

#[test]
fn next_passes_engine_output_through() -> TestResult {
    let project = setup()?;
    use_script_engine(&project, "echo \"next task for $1 $2 $3\"")?;

    tmw_cmd(&project)
        .arg("next")
        .assert()
        .success()
        .stdout(contains("🎯 Next task in alpha:").and(contains("next task for next --file")));
    Ok(())
}

#[test]
fn add_writes_into_current_workspace() -> TestResult {
    let project = setup()?;
    use_script_engine(&project, ADD_SCRIPT)?;
    let fixture = project.write_file(
        "fixture.json",
        &json!({ "tasks": [
            { "id": 1, "title": "Fix login", "status": "pending" },
            { "id": 2, "title": "Old", "status": "done" }
        ]})
        .to_string(),
    )?;

    tmw_cmd(&project)
        .args(["add", "Fix", "login"])
        .env("TMW_FIXTURE", &fixture)
        .assert()
        .success()
        .stdout(contains("➕ Adding task to alpha...").and(contains("engine: add")));

    let store = project.read_json(".taskmaster/workspaces/alpha/tasks.json")?;
    assert_eq!(store["tasks"][0]["title"], "Fix login");

    let metadata = project.read_json(".taskmaster/workspaces/alpha/metadata.json")?;
    assert_eq!(metadata["stats"]["totalTasks"], 2);
    assert_eq!(metadata["stats"]["completedTasks"], 1);

    let output = tmw_cmd(&project).args(["list", "--json"]).output()?;
    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["data"][0]["stats"]["totalTasks"], 2);
    Ok(())
}

#[test]
fn engine_failure_is_reported_not_fatal() -> TestResult {
    let project = setup()?;
    use_script_engine(&project, "exit 4")?;
    let before = project.read_bytes(".taskmaster/workspaces/alpha/tasks.json")?;

    tmw_cmd(&project)
        .arg("next")
        .assert()
        .code(0)
        .stderr(contains("Task engine `sh` failed with exit code 4"));
    tmw_cmd(&project)
        .args(["add", "anything"])
        .assert()
        .code(0)
        .stderr(contains("failed"));

    assert_eq!(project.read_bytes(".taskmaster/workspaces/alpha/tasks.json")?, before);
    Ok(())
}

#[test]
fn engine_timeout_is_reported() -> TestResult {
    let project = setup()?;
    project.write_file(
        ".tmw.toml",
        "[engine]\nprogram = \"sh\"\nargs = ['-c', 'sleep 30', 'engine']\ntimeout_secs = 1\n",
    )?;

    let output = tmw_cmd(&project).args(["next", "--json"]).output()?;
    assert_eq!(output.status.code(), Some(0));
    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["error"]["kind"], "external_tool_timeout");
    Ok(())
}
