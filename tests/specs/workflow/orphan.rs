//! Worktree orphan recovery at startup (spec.md §4.4 / §4.8 step 5): a
//! worktree directory left behind by a prior `covend` process, with no
//! in-flight workflow still claiming it, is either discarded (clean) or
//! blocks its task for manual attention (dirty).

use crate::prelude::*;
use std::process::Command;

fn git(ws: &Workspace, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(ws.path())
        .status()
        .expect("git should run");
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn clean_orphan_worktree_is_discarded_on_startup() {
    let ws = Workspace::new();
    ws.daemon_start();
    let task = ws.create_task("leftover clean", &[]);
    ws.daemon_stop();

    let worktree_path = ws.path().join(".coven/worktrees").join(&task);
    git(
        &ws,
        &[
            "worktree",
            "add",
            "-b",
            &format!("coven/{task}"),
            &worktree_path.to_string_lossy(),
            "main",
        ],
    );
    assert!(worktree_path.exists());

    ws.daemon_start();
    assert!(
        wait_for(|| !worktree_path.exists()),
        "a clean orphan worktree with no pending changes should be removed at startup"
    );
    assert_eq!(ws.task_status(&task), "open");
}

#[test]
fn dirty_orphan_worktree_blocks_its_task_on_startup() {
    let ws = Workspace::new();
    ws.daemon_start();
    let task = ws.create_task("leftover dirty", &[]);
    ws.coven().args(&["task", "claim", &task]).passes();
    ws.daemon_stop();

    let worktree_path = ws.path().join(".coven/worktrees").join(&task);
    git(
        &ws,
        &[
            "worktree",
            "add",
            "-b",
            &format!("coven/{task}"),
            &worktree_path.to_string_lossy(),
            "main",
        ],
    );
    std::fs::write(worktree_path.join("uncommitted.txt"), "work in progress\n")
        .expect("write uncommitted file");

    ws.daemon_start();
    assert!(
        wait_for(|| ws.task_status(&task) == "blocked"),
        "an orphan worktree with uncommitted changes should block its task at startup"
    );
    assert!(
        worktree_path.exists(),
        "a dirty orphan worktree is left in place for manual resolution, not removed"
    );
}
