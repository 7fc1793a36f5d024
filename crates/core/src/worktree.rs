// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree: a git working directory on a dedicated branch, isolated to one task.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worktree {
    pub task_id: TaskId,
    pub path: PathBuf,
    pub branch: String,
    pub base_branch: String,
    #[serde(default)]
    pub orphan: bool,
}

impl Worktree {
    pub fn branch_for(task_id: &TaskId) -> String {
        format!("coven/{}", task_id.as_str())
    }

    pub fn path_for(workspace_root: &std::path::Path, task_id: &TaskId) -> PathBuf {
        workspace_root
            .join(".coven")
            .join("worktrees")
            .join(task_id.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorktreeStatusCounts {
    pub staged: u32,
    pub modified: u32,
    pub untracked: u32,
    pub ahead: u32,
    pub behind: u32,
}

impl WorktreeStatusCounts {
    pub fn has_uncommitted_changes(&self) -> bool {
        self.staged > 0 || self.modified > 0 || self.untracked > 0
    }

    pub fn has_unmerged_commits(&self) -> bool {
        self.ahead > 0
    }

    pub fn diverged(&self) -> bool {
        self.ahead > 0 && self.behind > 0
    }
}
