//! `--help` smoke tests: every subcommand should at least print usage
//! without needing a running daemon.

use crate::prelude::*;

#[test]
fn top_level_help_lists_resource_families() {
    let ws = Workspace::new();
    ws.coven()
        .args(&["--help"])
        .passes()
        .stdout_has("daemon")
        .stdout_has("task")
        .stdout_has("workflow")
        .stdout_has("agent")
        .stdout_has("question")
        .stdout_has("session");
}

#[test]
fn daemon_help_lists_start_stop_status() {
    let ws = Workspace::new();
    ws.coven()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status");
}

#[test]
fn task_help_lists_crud_and_claim_verbs() {
    let ws = Workspace::new();
    ws.coven()
        .args(&["task", "--help"])
        .passes()
        .stdout_has("create")
        .stdout_has("claim")
        .stdout_has("bulk");
}

#[test]
fn workflow_help_does_not_require_a_running_daemon() {
    let ws = Workspace::new();
    // `coven workflow --help` is handled entirely by clap before the CLI
    // connects to covend, so it must succeed even with nothing started.
    ws.coven().args(&["workflow", "--help"]).passes();
}

#[test]
fn covend_version_flag_does_not_need_a_workspace() {
    let output = std::process::Command::new(covend_binary())
        .arg("--version")
        .output()
        .expect("covend should run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("covend"));
}
