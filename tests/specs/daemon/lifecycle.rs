//! Daemon start/stop/status lifecycle and single-instance arbitration
//! (spec.md §4.8, §8 scenario 6).

use crate::prelude::*;

#[test]
fn daemon_status_reports_not_running_before_start() {
    let ws = Workspace::new();
    ws.coven()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("not running");
}

#[test]
fn daemon_start_then_status_shows_state() {
    let ws = Workspace::new();
    ws.coven()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("started");
    ws.coven()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("workspace");
}

#[test]
fn daemon_start_twice_is_idempotent() {
    let ws = Workspace::new();
    ws.daemon_start();
    // Starting again for the same workspace should report already-running
    // rather than failing the CLI invocation or disturbing the live daemon.
    ws.coven()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("already running");
    ws.coven()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("workspace");
}

#[test]
fn daemon_stop_then_status_reports_not_running() {
    let ws = Workspace::new();
    ws.daemon_start();
    ws.daemon_stop();
    ws.coven()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("not running");
}

#[test]
fn daemon_creates_socket_and_pid_files() {
    let ws = Workspace::new();
    ws.daemon_start();
    assert!(wait_for(|| ws.socket_path().exists()), "socket should exist");
    assert!(wait_for(|| ws.pid_path().exists()), "pid file should exist");
}

#[test]
fn daemon_removes_socket_and_pid_on_stop() {
    let ws = Workspace::new();
    ws.daemon_start();
    ws.daemon_stop();
    assert!(!ws.socket_path().exists(), "socket should be removed on stop");
    assert!(!ws.pid_path().exists(), "pid file should be removed on stop");
}

#[test]
fn second_covend_refuses_to_start_while_first_is_running() {
    let ws = Workspace::new();
    ws.daemon_start();

    let output = std::process::Command::new(covend_binary())
        .arg(ws.path())
        .output()
        .expect("covend should run");
    assert!(
        !output.status.success(),
        "a second covend for the same workspace must refuse to start"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("already running"),
        "stderr should mention the running daemon, got: {stderr}"
    );

    // The original daemon must still be reachable and its files intact.
    ws.coven()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("workspace");
    assert!(ws.socket_path().exists());
    assert!(ws.pid_path().exists());
}

#[test]
fn daemon_restarts_cleanly_after_stop() {
    let ws = Workspace::new();
    ws.daemon_start();
    ws.daemon_stop();
    ws.daemon_start();
    ws.coven()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("workspace");
}
