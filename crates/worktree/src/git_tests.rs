// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::TempDir;

async fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    run_git_ok(dir.path(), &["init", "-q"], Duration::from_secs(10))
        .await
        .unwrap();
    run_git_ok(
        dir.path(),
        &["config", "user.email", "coven@example.com"],
        Duration::from_secs(10),
    )
    .await
    .unwrap();
    run_git_ok(
        dir.path(),
        &["config", "user.name", "coven"],
        Duration::from_secs(10),
    )
    .await
    .unwrap();
    std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
    run_git_ok(
        dir.path(),
        &["add", "."],
        Duration::from_secs(10),
    )
    .await
    .unwrap();
    run_git_ok(
        dir.path(),
        &["commit", "-q", "-m", "init"],
        Duration::from_secs(10),
    )
    .await
    .unwrap();
    dir
}

#[tokio::test]
async fn run_git_ok_captures_stdout() {
    let repo = init_repo().await;
    let out = run_git_ok(repo.path(), &["status", "--short"], Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(out, "");
}

#[tokio::test]
async fn run_git_ok_surfaces_nonzero_exit() {
    let repo = init_repo().await;
    let err = run_git_ok(
        repo.path(),
        &["show", "nonexistent-ref"],
        Duration::from_secs(10),
    )
    .await
    .unwrap_err();
    assert!(err.contains("exited"));
}
