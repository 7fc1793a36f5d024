//! Claim/release/reclaim and the conflicts they must reject
//! (spec.md §4.1, §4.7).

use crate::prelude::*;

#[test]
fn claim_moves_task_to_in_progress() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("claim me", &[]);

    let claimed = ws
        .coven()
        .args(&["task", "claim", &id, "--claimant", "worker-1"])
        .passes()
        .json();
    assert_eq!(claimed["status"], "in-progress");
    assert_eq!(claimed["claim"]["claimant"], "worker-1");
}

#[test]
fn claiming_an_already_claimed_task_fails() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("contested", &[]);

    ws.coven()
        .args(&["task", "claim", &id, "--claimant", "worker-1"])
        .passes();
    ws.coven()
        .args(&["task", "claim", &id, "--claimant", "worker-2"])
        .fails()
        .stderr_has("already claimed");
}

#[test]
fn release_returns_task_to_open_and_allows_reclaim() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("released", &[]);

    ws.coven()
        .args(&["task", "claim", &id, "--claimant", "worker-1"])
        .passes();
    ws.coven().args(&["task", "release", &id]).passes();

    let after_release = ws.coven().args(&["task", "get", &id]).passes().json();
    assert!(after_release["claim"].is_null());

    ws.coven()
        .args(&["task", "claim", &id, "--claimant", "worker-2"])
        .passes()
        .stdout_has("worker-2");
}

#[test]
fn reclaim_by_the_same_claimant_renews_without_error() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("renewed", &[]);

    ws.coven()
        .args(&["task", "claim", &id, "--claimant", "worker-1"])
        .passes();
    ws.coven()
        .args(&["task", "reclaim", &id, "--claimant", "worker-1"])
        .passes()
        .stdout_has("worker-1");
}

#[test]
fn reclaim_by_a_different_claimant_fails() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("disputed", &[]);

    ws.coven()
        .args(&["task", "claim", &id, "--claimant", "worker-1"])
        .passes();
    ws.coven()
        .args(&["task", "reclaim", &id, "--claimant", "worker-2"])
        .fails()
        .stderr_has("already claimed");
}
