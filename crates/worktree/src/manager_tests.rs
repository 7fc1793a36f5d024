// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::git::run_git_ok;
use std::time::Duration;
use tempfile::TempDir;

async fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for args in [
        vec!["init", "-q", "-b", "main"],
        vec!["config", "user.email", "coven@example.com"],
        vec!["config", "user.name", "coven"],
    ] {
        run_git_ok(root, &args, Duration::from_secs(10)).await.unwrap();
    }
    std::fs::write(root.join("README.md"), "hello\n").unwrap();
    run_git_ok(root, &["add", "."], Duration::from_secs(10))
        .await
        .unwrap();
    run_git_ok(root, &["commit", "-q", "-m", "init"], Duration::from_secs(10))
        .await
        .unwrap();
    dir
}

#[tokio::test]
async fn create_allocates_worktree_on_dedicated_branch() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let task_id = TaskId::new("T1");
    let worktree = manager.create(&task_id, "main").await.unwrap();
    assert_eq!(worktree.branch, "coven/T1");
    assert!(worktree.path.join("README.md").exists());
}

#[tokio::test]
async fn create_rejects_when_path_already_exists() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let task_id = TaskId::new("T1");
    manager.create(&task_id, "main").await.unwrap();
    let err = manager.create(&task_id, "main").await.unwrap_err();
    assert!(matches!(err, CovenError::WorktreeExists(_)));
}

#[tokio::test]
async fn status_reports_untracked_and_modified_files() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let task_id = TaskId::new("T1");
    let worktree = manager.create(&task_id, "main").await.unwrap();

    std::fs::write(worktree.path.join("new.txt"), "content\n").unwrap();
    let counts = manager.status(&worktree).await.unwrap();
    assert_eq!(counts.untracked, 1);
    assert!(!counts.has_unmerged_commits());
}

#[tokio::test]
async fn merge_brings_worktree_commit_into_base_branch() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let task_id = TaskId::new("T1");
    let worktree = manager.create(&task_id, "main").await.unwrap();

    std::fs::write(worktree.path.join("feature.txt"), "new feature\n").unwrap();
    run_git_ok(&worktree.path, &["add", "."], Duration::from_secs(10))
        .await
        .unwrap();
    run_git_ok(
        &worktree.path,
        &["commit", "-q", "-m", "add feature"],
        Duration::from_secs(10),
    )
    .await
    .unwrap();

    manager.merge(&worktree).await.unwrap();
    assert!(repo.path().join("feature.txt").exists());
}

#[tokio::test]
async fn merge_conflict_aborts_and_reports_files() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let task_id = TaskId::new("T1");
    let worktree = manager.create(&task_id, "main").await.unwrap();

    std::fs::write(worktree.path.join("README.md"), "worktree change\n").unwrap();
    run_git_ok(&worktree.path, &["add", "."], Duration::from_secs(10))
        .await
        .unwrap();
    run_git_ok(
        &worktree.path,
        &["commit", "-q", "-m", "worktree edit"],
        Duration::from_secs(10),
    )
    .await
    .unwrap();

    std::fs::write(repo.path().join("README.md"), "base change\n").unwrap();
    run_git_ok(repo.path(), &["add", "."], Duration::from_secs(10))
        .await
        .unwrap();
    run_git_ok(
        repo.path(),
        &["commit", "-q", "-m", "base edit"],
        Duration::from_secs(10),
    )
    .await
    .unwrap();

    let err = manager.merge(&worktree).await.unwrap_err();
    match err {
        CovenError::MergeConflict(files) => assert_eq!(files, vec!["README.md".to_string()]),
        other => panic!("expected MergeConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn remove_deletes_worktree_directory_and_branch() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let task_id = TaskId::new("T1");
    let worktree = manager.create(&task_id, "main").await.unwrap();
    let path = worktree.path.clone();

    manager.remove(&worktree).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn find_orphans_detects_unregistered_directory() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let worktrees_root = repo.path().join(".coven").join("worktrees");
    std::fs::create_dir_all(worktrees_root.join("stale-task")).unwrap();

    let orphans = manager.find_orphans(&[]).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert!(orphans[0].ends_with("stale-task"));
}

#[tokio::test]
async fn find_orphans_excludes_running_registered_worktree() {
    let repo = init_repo().await;
    let manager = WorktreeManager::new(repo.path());
    let task_id = TaskId::new("T1");
    manager.create(&task_id, "main").await.unwrap();

    let orphans = manager.find_orphans(&[task_id]).await.unwrap();
    assert!(orphans.is_empty());
}
