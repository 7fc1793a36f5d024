// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable event log. Every mutation to a task, workflow, worktree, or
//! question is an `Event`; the WAL stores them, and [`crate::define_id`]-typed
//! ids route them during replay. Agent output lines are intentionally absent
//! here — they are ephemeral and never durable (see [`crate::agent_output`]).

use crate::question::QuestionId;
use crate::task::{AuditKind, TaskId, TaskStatus};
use crate::workflow::{MergeReviewRecord, StepPath, StepResult, WorkflowId, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    // --- Task Store ---
    TaskCreated {
        task: crate::task::Task,
    },
    TaskFieldsUpdated {
        id: TaskId,
        title: Option<String>,
        body: Option<String>,
        priority: Option<i32>,
        at: DateTime<Utc>,
    },
    TaskTagsChanged {
        id: TaskId,
        added: Vec<String>,
        removed: Vec<String>,
        at: DateTime<Utc>,
    },
    TaskReparented {
        id: TaskId,
        new_parent: Option<TaskId>,
        /// New depth for `id` and every descendant, recomputed in one transaction.
        subtree_depths: Vec<(TaskId, u32)>,
        at: DateTime<Utc>,
    },
    TaskClaimed {
        id: TaskId,
        claimant: String,
        at: DateTime<Utc>,
    },
    TaskReclaimed {
        id: TaskId,
        claimant: String,
        at: DateTime<Utc>,
    },
    TaskReleased {
        id: TaskId,
        at: DateTime<Utc>,
    },
    TaskStatusChanged {
        id: TaskId,
        status: TaskStatus,
        at: DateTime<Utc>,
    },
    TaskDeleted {
        /// `id` plus every descendant, soft-deleted in one transaction.
        ids: Vec<TaskId>,
        at: DateTime<Utc>,
    },
    TaskPurged {
        ids: Vec<TaskId>,
    },
    TaskAuditAppended {
        task_id: TaskId,
        kind: AuditKind,
        before: Option<String>,
        after: Option<String>,
        actor: String,
        at: DateTime<Utc>,
    },

    // --- Worktree Manager ---
    WorktreeCreated {
        worktree: crate::worktree::Worktree,
    },
    WorktreeRemoved {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    WorktreeOrphanRecovered {
        task_id: TaskId,
        blocked: bool,
        at: DateTime<Utc>,
    },

    // --- Workflow Engine ---
    WorkflowStarted {
        workflow: crate::workflow::WorkflowState,
    },
    WorkflowStepStarted {
        workflow_id: WorkflowId,
        step_path: StepPath,
        step_name: String,
        at: DateTime<Utc>,
    },
    WorkflowStepCompleted {
        workflow_id: WorkflowId,
        step_name: String,
        result: StepResult,
        at: DateTime<Utc>,
    },
    WorkflowLoopIteration {
        workflow_id: WorkflowId,
        step_path: StepPath,
        iteration: u32,
        at: DateTime<Utc>,
    },
    WorkflowStepAdvanced {
        workflow_id: WorkflowId,
        next_step: StepPath,
        at: DateTime<Utc>,
    },
    WorkflowTransitioned {
        workflow_id: WorkflowId,
        status: WorkflowStatus,
        error: Option<String>,
        at: DateTime<Utc>,
    },
    WorkflowMergeReviewRequested {
        workflow_id: WorkflowId,
        record: MergeReviewRecord,
        at: DateTime<Utc>,
    },
    WorkflowMergeReviewDecided {
        workflow_id: WorkflowId,
        approved: bool,
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    WorkflowRetired {
        workflow_id: WorkflowId,
        at: DateTime<Utc>,
    },

    // --- Question Detector & Router ---
    QuestionDetected {
        question: crate::question::Question,
    },
    QuestionAnswered {
        id: QuestionId,
        answer: String,
        at: DateTime<Utc>,
    },
    QuestionDelivered {
        id: QuestionId,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short summary for structured logging, mirroring each variant's identity.
    pub fn log_summary(&self) -> String {
        match self {
            Event::TaskCreated { task } => format!("task_created id={}", task.id),
            Event::TaskFieldsUpdated { id, .. } => format!("task_fields_updated id={id}"),
            Event::TaskTagsChanged { id, .. } => format!("task_tags_changed id={id}"),
            Event::TaskReparented { id, .. } => format!("task_reparented id={id}"),
            Event::TaskClaimed { id, claimant, .. } => {
                format!("task_claimed id={id} claimant={claimant}")
            }
            Event::TaskReclaimed { id, .. } => format!("task_reclaimed id={id}"),
            Event::TaskReleased { id, .. } => format!("task_released id={id}"),
            Event::TaskStatusChanged { id, status, .. } => {
                format!("task_status_changed id={id} status={status}")
            }
            Event::TaskDeleted { ids, .. } => format!("task_deleted count={}", ids.len()),
            Event::TaskPurged { ids } => format!("task_purged count={}", ids.len()),
            Event::TaskAuditAppended { task_id, .. } => format!("task_audit id={task_id}"),
            Event::WorktreeCreated { worktree } => {
                format!("worktree_created task_id={}", worktree.task_id)
            }
            Event::WorktreeRemoved { task_id, .. } => format!("worktree_removed task_id={task_id}"),
            Event::WorktreeOrphanRecovered { task_id, blocked, .. } => {
                format!("worktree_orphan_recovered task_id={task_id} blocked={blocked}")
            }
            Event::WorkflowStarted { workflow } => {
                format!("workflow_started id={} task_id={}", workflow.id, workflow.task_id)
            }
            Event::WorkflowStepStarted {
                workflow_id,
                step_name,
                ..
            } => format!("workflow_step_started id={workflow_id} step={step_name}"),
            Event::WorkflowStepCompleted {
                workflow_id,
                step_name,
                ..
            } => format!("workflow_step_completed id={workflow_id} step={step_name}"),
            Event::WorkflowLoopIteration {
                workflow_id,
                iteration,
                ..
            } => format!("workflow_loop_iteration id={workflow_id} iteration={iteration}"),
            Event::WorkflowStepAdvanced { workflow_id, .. } => {
                format!("workflow_step_advanced id={workflow_id}")
            }
            Event::WorkflowTransitioned {
                workflow_id, status, ..
            } => format!("workflow_transitioned id={workflow_id} status={status:?}"),
            Event::WorkflowMergeReviewRequested { workflow_id, .. } => {
                format!("workflow_merge_review_requested id={workflow_id}")
            }
            Event::WorkflowMergeReviewDecided {
                workflow_id,
                approved,
                ..
            } => format!("workflow_merge_review_decided id={workflow_id} approved={approved}"),
            Event::WorkflowRetired { workflow_id, .. } => {
                format!("workflow_retired id={workflow_id}")
            }
            Event::QuestionDetected { question } => {
                format!("question_detected id={}", question.id)
            }
            Event::QuestionAnswered { id, .. } => format!("question_answered id={id}"),
            Event::QuestionDelivered { id, .. } => format!("question_delivered id={id}"),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
