// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow state: one execution of a grimoire against one task.

use crate::grimoire::StepAction;
use crate::task::TaskId;
use crate::value::Value;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a workflow run.
    pub struct WorkflowId;
}

/// A path into nested loop steps, e.g. `[1, 0]` means "loop step at index 1,
/// nested step at index 0".
pub type StepPath = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    PendingMerge,
    Blocked,
    Cancelled,
    Failed,
    Completed,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Cancelled | WorkflowStatus::Failed | WorkflowStatus::Completed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub summary: String,
    #[serde(default)]
    pub outputs: IndexMap<String, Value>,
    #[serde(default)]
    pub raw_output: String,
    #[serde(default)]
    pub skipped: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub action: StepAction,
}

impl StepResult {
    pub fn skipped_because_when_false() -> Self {
        Self {
            success: true,
            exit_code: None,
            summary: String::new(),
            outputs: IndexMap::new(),
            raw_output: String::new(),
            skipped: true,
            duration_ms: 0,
            error: None,
            action: StepAction::Continue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReviewRecord {
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub approved: Option<bool>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: WorkflowId,
    pub task_id: TaskId,
    pub grimoire_name: String,
    pub status: WorkflowStatus,
    pub current_step: StepPath,
    pub worktree_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Completed step results keyed by step name (spec: "by name/index").
    #[serde(default)]
    pub step_results: IndexMap<String, StepResult>,
    /// Named step outputs, addressable from templates as `{{.<name>.field}}`.
    #[serde(default)]
    pub step_outputs: IndexMap<String, Value>,
    pub error: Option<String>,
    pub merge_review: Option<MergeReviewRecord>,
    /// Current iteration count per loop step, keyed by the loop's dotted step path.
    #[serde(default)]
    pub loop_iterations: IndexMap<String, u32>,
    /// Snapshot of `previous` captured the instant each loop was entered.
    #[serde(default)]
    pub loop_entries: IndexMap<String, Value>,
}

impl WorkflowState {
    pub fn path_key(path: &[usize]) -> String {
        path.iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
