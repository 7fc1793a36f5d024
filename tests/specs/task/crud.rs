//! Task CRUD, tags, status transitions, and listing/filtering
//! (spec.md §4.1 / §6.2 `/tasks*`).

use crate::prelude::*;

#[test]
fn create_and_get_round_trip() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let created = ws
        .coven()
        .args(&["task", "create", "fix the parser", "--body", "details here", "--priority", "5"])
        .passes()
        .json();
    assert_eq!(created["title"], "fix the parser");
    assert_eq!(created["body"], "details here");
    assert_eq!(created["priority"], 5);
    assert_eq!(created["status"], "open");

    let id = created["id"].as_str().unwrap();
    ws.coven()
        .args(&["task", "get", id])
        .passes()
        .stdout_has("fix the parser");
}

#[test]
fn create_with_tags() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let created = ws
        .coven()
        .args(&["task", "create", "tagged task", "--tag", "backend", "--tag", "urgent"])
        .passes()
        .json();
    let tags: Vec<&str> = created["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert!(tags.contains(&"backend"));
    assert!(tags.contains(&"urgent"));
}

#[test]
fn list_filters_by_status_and_tag() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let a = ws.create_task("task a", &["--tag", "alpha"]);
    let _b = ws.create_task("task b", &["--tag", "beta"]);

    let filtered = ws
        .coven()
        .args(&["task", "list", "--tag", "alpha"])
        .passes()
        .json();
    let ids: Vec<&str> = filtered
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![a.as_str()]);
}

#[test]
fn update_changes_title_body_and_priority() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("before", &[]);

    let updated = ws
        .coven()
        .args(&["task", "update", &id, "--title", "after", "--priority", "9"])
        .passes()
        .json();
    assert_eq!(updated["title"], "after");
    assert_eq!(updated["priority"], 9);
}

#[test]
fn tag_and_untag_round_trip() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("needs tags", &[]);

    ws.coven().args(&["task", "tag", &id, "needs-review"]).passes();
    let tagged = ws.coven().args(&["task", "get", &id]).passes().json();
    assert!(tagged["tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "needs-review"));

    ws.coven().args(&["task", "untag", &id, "needs-review"]).passes();
    let untagged = ws.coven().args(&["task", "get", &id]).passes().json();
    assert!(!untagged["tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "needs-review"));
}

#[test]
fn set_status_rejects_invalid_transition() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("fresh", &[]);

    // Open -> Closed directly is not a valid transition (must pass through
    // InProgress / PendingMerge first, per TaskStatus::can_transition_to).
    ws.coven()
        .args(&["task", "set-status", &id, "closed"])
        .fails()
        .stderr_has("invalid status transition");
}

#[test]
fn delete_soft_deletes_and_hides_from_default_listing() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("doomed", &[]);

    ws.coven().args(&["task", "delete", &id]).passes();
    let listed = ws.coven().args(&["task", "list"]).passes().json();
    assert!(!listed
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["id"] == id.as_str()));
}

#[test]
fn ready_excludes_claimed_and_blocked_tasks() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let open = ws.create_task("open task", &[]);
    let claimed = ws.create_task("claimed task", &[]);
    ws.coven().args(&["task", "claim", &claimed]).passes();

    let ready = ws.coven().args(&["task", "ready"]).passes().json();
    let ids: Vec<&str> = ready
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&open.as_str()));
    assert!(!ids.contains(&claimed.as_str()));
}

#[test]
fn history_records_status_and_priority_changes() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("audited", &[]);

    ws.coven()
        .args(&["task", "update", &id, "--priority", "3"])
        .passes();
    ws.coven().args(&["task", "claim", &id]).passes();
    ws.coven()
        .args(&["task", "set-status", &id, "closed"])
        .passes();

    let history = ws.coven().args(&["task", "history", &id]).passes().json();
    let kinds: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"priority"));
    assert!(kinds.contains(&"status"));
}
