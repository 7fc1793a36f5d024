//! Bulk task operations: all-or-nothing tag/status/priority/delete across a
//! batch of ids (spec.md §4.1's bulk contract, `POST /tasks/bulk`).

use crate::prelude::*;

#[test]
fn bulk_add_tags_applies_to_every_task() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let a = ws.create_task("a", &[]);
    let b = ws.create_task("b", &[]);

    let result = ws
        .coven()
        .args(&["task", "bulk", "--id", &a, "--id", &b, "add-tags", "swept"])
        .passes()
        .json();
    for task in result.as_array().unwrap() {
        assert!(task["tags"].as_array().unwrap().iter().any(|t| t == "swept"));
    }
}

#[test]
fn bulk_set_priority_applies_to_every_task() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let a = ws.create_task("a", &[]);
    let b = ws.create_task("b", &[]);

    ws.coven()
        .args(&["task", "bulk", "--id", &a, "--id", &b, "set-priority", "42"])
        .passes();

    assert_eq!(
        ws.coven().args(&["task", "get", &a]).passes().json()["priority"],
        42
    );
    assert_eq!(
        ws.coven().args(&["task", "get", &b]).passes().json()["priority"],
        42
    );
}

#[test]
fn bulk_rejects_whole_batch_on_invalid_status_transition() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let a = ws.create_task("a", &[]);
    let b = ws.create_task("b", &[]);

    // Open -> Closed is not a direct transition for either task, so the
    // whole batch must be rejected and neither task's status should change.
    ws.coven()
        .args(&["task", "bulk", "--id", &a, "--id", &b, "set-status", "closed"])
        .fails()
        .stderr_has("invalid status transition");

    assert_eq!(ws.task_status(&a), "open");
    assert_eq!(ws.task_status(&b), "open");
}

#[test]
fn bulk_unknown_id_fails_whole_batch() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let a = ws.create_task("a", &[]);

    ws.coven()
        .args(&["task", "bulk", "--id", &a, "--id", "does-not-exist", "add-tags", "x"])
        .fails()
        .stderr_has("not found");

    let after = ws.coven().args(&["task", "get", &a]).passes().json();
    assert!(!after["tags"].as_array().unwrap().iter().any(|t| t == "x"));
}

#[test]
fn bulk_delete_cascades_to_descendants() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let parent = ws.create_task("parent", &[]);
    let child = ws.create_task("child", &["--parent", &parent]);

    ws.coven().args(&["task", "bulk", "--id", &parent, "delete"]).passes();

    let listed = ws.coven().args(&["task", "list"]).passes().json();
    let ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(!ids.contains(&parent.as_str()));
    assert!(!ids.contains(&child.as_str()));
}
