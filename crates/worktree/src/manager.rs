// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree lifecycle: create a per-task git worktree, query its status,
//! merge its branch back, and clean up, per the allocation scheme in
//! `coven_core::worktree`.

use crate::git::{run_git, run_git_ok, GIT_WORKTREE_TIMEOUT};
use crate::status::build_status_counts;
use coven_core::{CovenError, Result, TaskId, Worktree, WorktreeStatusCounts};
use std::path::{Path, PathBuf};

/// Owns git worktree operations for one workspace checkout.
#[derive(Debug, Clone)]
pub struct WorktreeManager {
    workspace_root: PathBuf,
}

impl WorktreeManager {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    fn worktrees_root(&self) -> PathBuf {
        self.workspace_root.join(".coven").join("worktrees")
    }

    /// Creates `<workspace>/.coven/worktrees/<task-id>` on a fresh branch
    /// `coven/<task-id>` based on `base_branch`'s current head.
    pub async fn create(&self, task_id: &TaskId, base_branch: &str) -> Result<Worktree> {
        let path = Worktree::path_for(&self.workspace_root, task_id);
        if path.exists() {
            return Err(CovenError::WorktreeExists(task_id.to_string()));
        }
        let branch = Worktree::branch_for(task_id);
        std::fs::create_dir_all(self.worktrees_root())?;
        run_git_ok(
            &self.workspace_root,
            &[
                "worktree",
                "add",
                "-b",
                &branch,
                &path.to_string_lossy(),
                base_branch,
            ],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map_err(CovenError::Internal)?;
        Ok(Worktree {
            task_id: task_id.clone(),
            path,
            branch,
            base_branch: base_branch.to_string(),
            orphan: false,
        })
    }

    /// Lists worktree paths currently registered with git, excluding the
    /// primary working tree, by parsing `git worktree list --porcelain`.
    pub async fn list_registered(&self) -> Result<Vec<PathBuf>> {
        let output = run_git_ok(
            &self.workspace_root,
            &["worktree", "list", "--porcelain"],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map_err(CovenError::Internal)?;
        let mut paths = Vec::new();
        for line in output.lines() {
            if let Some(path) = line.strip_prefix("worktree ") {
                paths.push(PathBuf::from(path));
            }
        }
        // First entry is always the main checkout.
        if !paths.is_empty() {
            paths.remove(0);
        }
        Ok(paths)
    }

    pub async fn status(&self, worktree: &Worktree) -> Result<WorktreeStatusCounts> {
        let porcelain = run_git_ok(
            &worktree.path,
            &["status", "--porcelain=v2"],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map_err(CovenError::Internal)?;
        let range = format!("{}...{}", worktree.base_branch, worktree.branch);
        let rev_list = run_git_ok(
            &worktree.path,
            &["rev-list", "--left-right", "--count", &range],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map_err(CovenError::Internal)?;
        // `rev-list --left-right` reports "<left>\t<right>" for <base>...<branch>,
        // meaning left = commits only in base (behind), right = commits only in
        // branch (ahead). Swap into our ahead/behind convention.
        let (behind, ahead) = crate::status::parse_rev_list_counts(&rev_list);
        let mut counts = build_status_counts(&porcelain, "0\t0");
        counts.ahead = ahead;
        counts.behind = behind;
        Ok(counts)
    }

    /// Merges `worktree.branch` into `worktree.base_branch` with
    /// `--no-ff`, run from the primary checkout. On conflict, aborts the
    /// merge and returns the list of conflicting files.
    pub async fn merge(&self, worktree: &Worktree) -> Result<()> {
        let checkout = run_git(
            &self.workspace_root,
            &["checkout", &worktree.base_branch],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map_err(CovenError::Internal)?;
        if !checkout.status.success() {
            return Err(CovenError::Internal(format!(
                "failed to checkout {}: {}",
                worktree.base_branch,
                String::from_utf8_lossy(&checkout.stderr)
            )));
        }

        let merge = run_git(
            &self.workspace_root,
            &["merge", "--no-ff", "-m", &format!("merge {}", worktree.branch), &worktree.branch],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map_err(CovenError::Internal)?;

        if merge.status.success() {
            return Ok(());
        }

        let conflicts = self.conflicting_files().await.unwrap_or_default();
        let _ = run_git(
            &self.workspace_root,
            &["merge", "--abort"],
            GIT_WORKTREE_TIMEOUT,
        )
        .await;
        Err(CovenError::MergeConflict(conflicts))
    }

    async fn conflicting_files(&self) -> Result<Vec<String>> {
        let output = run_git_ok(
            &self.workspace_root,
            &["diff", "--name-only", "--diff-filter=U"],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map_err(CovenError::Internal)?;
        Ok(output.lines().map(|s| s.to_string()).collect())
    }

    /// Removes the worktree directory and its branch. Cleanup failures are
    /// logged by the caller, never fatal (spec.md §4.4).
    pub async fn remove(&self, worktree: &Worktree) -> Result<()> {
        let _ = run_git(
            &self.workspace_root,
            &["worktree", "remove", "--force", &worktree.path.to_string_lossy()],
            GIT_WORKTREE_TIMEOUT,
        )
        .await;
        if worktree.path.exists() {
            std::fs::remove_dir_all(&worktree.path)?;
        }
        let _ = run_git(
            &self.workspace_root,
            &["branch", "-D", &worktree.branch],
            GIT_WORKTREE_TIMEOUT,
        )
        .await;
        Ok(())
    }

    /// Finds worktrees on disk under the worktrees root that git does not
    /// currently consider registered, or whose task id is not among
    /// `running_task_ids`. These are orphans from a previous daemon
    /// instance (spec.md §4.4).
    pub async fn find_orphans(&self, running_task_ids: &[TaskId]) -> Result<Vec<PathBuf>> {
        let root = self.worktrees_root();
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let registered = self.list_registered().await?;
        let mut orphans = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            let task_id_str = entry.file_name().to_string_lossy().into_owned();
            let is_running = running_task_ids.iter().any(|t| t.as_str() == task_id_str);
            let is_registered = registered.iter().any(|p| p == &path);
            if !is_running || !is_registered {
                orphans.push(path);
            }
        }
        Ok(orphans)
    }

    pub fn resolve_worktree(&self, task_id: &TaskId, base_branch: &str) -> Worktree {
        Worktree {
            task_id: task_id.clone(),
            path: Worktree::path_for(&self.workspace_root, task_id),
            branch: Worktree::branch_for(task_id),
            base_branch: base_branch.to_string(),
            orphan: false,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
