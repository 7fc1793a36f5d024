//! Parent/child task hierarchy: creation under a parent, reparenting,
//! cycle rejection, and children/depth bookkeeping (spec.md §4.1).

use crate::prelude::*;

#[test]
fn child_created_under_parent_has_depth_one() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let parent = ws.create_task("parent", &[]);
    let child = ws
        .coven()
        .args(&["task", "create", "child", "--parent", &parent])
        .passes()
        .json();
    assert_eq!(child["parent"], parent.as_str());
    assert_eq!(child["depth"], 1);
}

#[test]
fn children_lists_only_direct_children() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let parent = ws.create_task("parent", &[]);
    let child_a = ws.create_task("child a", &["--parent", &parent]);
    let child_b = ws.create_task("child b", &["--parent", &parent]);
    let _grandchild = ws.create_task("grandchild", &["--parent", &child_a]);

    let children = ws
        .coven()
        .args(&["task", "children", &parent])
        .passes()
        .json();
    let ids: Vec<&str> = children
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&child_a.as_str()));
    assert!(ids.contains(&child_b.as_str()));
}

#[test]
fn ancestors_lists_parent_chain_nearest_first() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let root = ws.create_task("root", &[]);
    let mid = ws.create_task("mid", &["--parent", &root]);
    let leaf = ws.create_task("leaf", &["--parent", &mid]);

    let ancestors = ws
        .coven()
        .args(&["task", "ancestors", &leaf])
        .passes()
        .json();
    let ids: Vec<&str> = ancestors
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![mid.as_str(), root.as_str()]);
}

#[test]
fn subtree_lists_every_descendant() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let root = ws.create_task("root", &[]);
    let mid = ws.create_task("mid", &["--parent", &root]);
    let leaf = ws.create_task("leaf", &["--parent", &mid]);
    let _unrelated = ws.create_task("unrelated", &[]);

    let subtree = ws.coven().args(&["task", "subtree", &root]).passes().json();
    let ids: Vec<&str> = subtree
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&mid.as_str()));
    assert!(ids.contains(&leaf.as_str()));
}

#[test]
fn reparent_updates_depth_of_whole_subtree() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let root_a = ws.create_task("root a", &[]);
    let root_b = ws.create_task("root b", &[]);
    let mid = ws.create_task("mid", &["--parent", &root_a]);
    let leaf = ws.create_task("leaf", &["--parent", &mid]);

    ws.coven()
        .args(&["task", "reparent", &mid, "--parent", &root_b])
        .passes();

    let mid_after = ws.coven().args(&["task", "get", &mid]).passes().json();
    assert_eq!(mid_after["parent"], root_b.as_str());
    assert_eq!(mid_after["depth"], 1);

    let leaf_after = ws.coven().args(&["task", "get", &leaf]).passes().json();
    assert_eq!(leaf_after["depth"], 2);
}

#[test]
fn reparent_rejects_cycle_through_own_descendant() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let parent = ws.create_task("parent", &[]);
    let child = ws.create_task("child", &["--parent", &parent]);

    // Making `parent`'s new parent be its own child would create a cycle.
    ws.coven()
        .args(&["task", "reparent", &parent, "--parent", &child])
        .fails()
        .stderr_has("cycle");
}

#[test]
fn reparent_to_root_clears_parent_and_resets_depth() {
    let ws = Workspace::new();
    ws.daemon_start_paused();

    let parent = ws.create_task("parent", &[]);
    let child = ws.create_task("child", &["--parent", &parent]);

    ws.coven().args(&["task", "reparent", &child]).passes();

    let after = ws.coven().args(&["task", "get", &child]).passes().json();
    assert!(after["parent"].is_null());
    assert_eq!(after["depth"], 0);
}
