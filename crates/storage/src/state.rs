// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay.

use coven_core::{
    Event, Question, Task, TaskAuditEntry, TaskId, TaskStatus, Worktree, WorkflowState,
    WorkflowStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The complete state derived by folding every durable [`Event`] in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub tasks: HashMap<String, Task>,
    /// Audit trail per task, newest last.
    #[serde(default)]
    pub task_audit: HashMap<String, Vec<TaskAuditEntry>>,
    /// Worktrees keyed by task id. A task has at most one live worktree.
    #[serde(default)]
    pub worktrees: HashMap<String, Worktree>,
    #[serde(default)]
    pub workflows: HashMap<String, WorkflowState>,
    #[serde(default)]
    pub questions: HashMap<String, Question>,
}

impl MaterializedState {
    /// Get a task by id or unique prefix (like git commit hashes).
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        if let Some(task) = self.tasks.get(id) {
            return Some(task);
        }
        let matches: Vec<_> = self.tasks.iter().filter(|(k, _)| k.starts_with(id)).collect();
        if matches.len() == 1 {
            Some(matches[0].1)
        } else {
            None
        }
    }

    /// Get a workflow by id or unique prefix.
    pub fn get_workflow(&self, id: &str) -> Option<&WorkflowState> {
        if let Some(wf) = self.workflows.get(id) {
            return Some(wf);
        }
        let matches: Vec<_> = self
            .workflows
            .iter()
            .filter(|(k, _)| k.starts_with(id))
            .collect();
        if matches.len() == 1 {
            Some(matches[0].1)
        } else {
            None
        }
    }

    /// Get a question by id or unique prefix.
    pub fn get_question(&self, id: &str) -> Option<&Question> {
        if let Some(q) = self.questions.get(id) {
            return Some(q);
        }
        let matches: Vec<_> = self
            .questions
            .iter()
            .filter(|(k, _)| k.starts_with(id))
            .collect();
        if matches.len() == 1 {
            Some(matches[0].1)
        } else {
            None
        }
    }

    /// Find the workflow currently driving a given task, if any is running.
    pub fn active_workflow_for_task(&self, task_id: &str) -> Option<&WorkflowState> {
        self.workflows
            .values()
            .find(|wf| wf.task_id.as_str() == task_id && !wf.status.is_terminal())
    }

    /// Children of a task, in no particular order.
    pub fn children_of(&self, task_id: &TaskId) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|t| t.parent.as_ref() == Some(task_id))
            .collect()
    }

    /// Apply an event to derive state changes.
    ///
    /// This is the event-sourcing approach where state is derived from events.
    /// Events are facts about what happened; state is derived from those facts.
    ///
    /// # Idempotency Requirement
    ///
    /// **All event handlers MUST be idempotent.** Applying the same event twice
    /// must produce the same state as applying it once. This is critical because
    /// events may be applied multiple times:
    ///
    /// 1. In the executor, for immediate visibility to the caller
    /// 2. During WAL replay on restart
    ///
    /// Guidelines for idempotent handlers:
    /// - Use assignment (`=`) instead of mutation (`+=`, `-=`)
    /// - Guard inserts with existence checks (`if !map.contains_key(...)`)
    /// - Guard status-derived increments with a transition check, not a counter
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::TaskCreated { task } => {
                self.tasks
                    .entry(task.id.to_string())
                    .or_insert_with(|| task.clone());
            }
            Event::TaskFieldsUpdated {
                id,
                title,
                body,
                priority,
                at,
            } => {
                if let Some(task) = self.tasks.get_mut(id.as_str()) {
                    if let Some(title) = title {
                        task.title = title.clone();
                    }
                    if let Some(body) = body {
                        task.body = body.clone();
                    }
                    if let Some(priority) = priority {
                        task.priority = *priority;
                    }
                    task.updated_at = *at;
                }
            }
            Event::TaskTagsChanged {
                id,
                added,
                removed,
                at,
            } => {
                if let Some(task) = self.tasks.get_mut(id.as_str()) {
                    for tag in added {
                        task.tags.insert(tag.clone());
                    }
                    for tag in removed {
                        task.tags.remove(tag);
                    }
                    task.updated_at = *at;
                }
            }
            Event::TaskReparented {
                id,
                new_parent,
                subtree_depths,
                at,
            } => {
                if let Some(task) = self.tasks.get_mut(id.as_str()) {
                    task.parent = new_parent.clone();
                    task.updated_at = *at;
                }
                for (task_id, depth) in subtree_depths {
                    if let Some(task) = self.tasks.get_mut(task_id.as_str()) {
                        task.depth = *depth;
                    }
                }
            }
            Event::TaskClaimed { id, claimant, at } => {
                if let Some(task) = self.tasks.get_mut(id.as_str()) {
                    task.claim = Some(coven_core::ClaimRecord {
                        claimant: claimant.clone(),
                        claimed_at: *at,
                    });
                    if task.status == TaskStatus::Open {
                        task.status = TaskStatus::InProgress;
                    }
                    task.updated_at = *at;
                }
            }
            Event::TaskReclaimed { id, claimant, at } => {
                if let Some(task) = self.tasks.get_mut(id.as_str()) {
                    task.claim = Some(coven_core::ClaimRecord {
                        claimant: claimant.clone(),
                        claimed_at: *at,
                    });
                    task.updated_at = *at;
                }
            }
            Event::TaskReleased { id, at } => {
                if let Some(task) = self.tasks.get_mut(id.as_str()) {
                    task.claim = None;
                    if task.status == TaskStatus::InProgress {
                        task.status = TaskStatus::Open;
                    }
                    task.updated_at = *at;
                }
            }
            Event::TaskStatusChanged { id, status, at } => {
                if let Some(task) = self.tasks.get_mut(id.as_str()) {
                    task.status = *status;
                    task.updated_at = *at;
                }
            }
            Event::TaskDeleted { ids, at } => {
                for id in ids {
                    if let Some(task) = self.tasks.get_mut(id.as_str()) {
                        task.status = TaskStatus::SoftDeleted;
                        task.deleted_at = Some(*at);
                        task.updated_at = *at;
                    }
                }
            }
            Event::TaskPurged { ids } => {
                for id in ids {
                    self.tasks.remove(id.as_str());
                    self.task_audit.remove(id.as_str());
                }
            }
            Event::TaskAuditAppended {
                task_id,
                kind,
                before,
                after,
                actor,
                at,
            } => {
                let entry = TaskAuditEntry {
                    task_id: task_id.clone(),
                    kind: *kind,
                    before: before.clone(),
                    after: after.clone(),
                    actor: actor.clone(),
                    at: *at,
                };
                self.task_audit
                    .entry(task_id.to_string())
                    .or_default()
                    .push(entry);
            }

            Event::WorktreeCreated { worktree } => {
                self.worktrees
                    .entry(worktree.task_id.to_string())
                    .or_insert_with(|| worktree.clone());
            }
            Event::WorktreeRemoved { task_id, .. } => {
                self.worktrees.remove(task_id.as_str());
            }
            Event::WorktreeOrphanRecovered {
                task_id, blocked, ..
            } => {
                if let Some(worktree) = self.worktrees.get_mut(task_id.as_str()) {
                    worktree.orphan = true;
                }
                if *blocked {
                    if let Some(task) = self.tasks.get_mut(task_id.as_str()) {
                        task.status = TaskStatus::Blocked;
                    }
                }
            }

            Event::WorkflowStarted { workflow } => {
                self.workflows
                    .entry(workflow.id.to_string())
                    .or_insert_with(|| workflow.clone());
            }
            Event::WorkflowStepStarted {
                workflow_id,
                step_path,
                at,
                ..
            } => {
                if let Some(wf) = self.workflows.get_mut(workflow_id.as_str()) {
                    wf.current_step = step_path.clone();
                    wf.updated_at = *at;
                }
            }
            Event::WorkflowStepCompleted {
                workflow_id,
                step_name,
                result,
                at,
            } => {
                if let Some(wf) = self.workflows.get_mut(workflow_id.as_str()) {
                    for (name, value) in &result.outputs {
                        wf.step_outputs.insert(name.clone(), value.clone());
                    }
                    wf.step_results.insert(step_name.clone(), result.clone());
                    wf.updated_at = *at;
                }
            }
            Event::WorkflowLoopIteration {
                workflow_id,
                step_path,
                iteration,
                at,
            } => {
                if let Some(wf) = self.workflows.get_mut(workflow_id.as_str()) {
                    let key = WorkflowState::path_key(step_path);
                    wf.loop_iterations.insert(key, *iteration);
                    wf.updated_at = *at;
                }
            }
            Event::WorkflowStepAdvanced {
                workflow_id,
                next_step,
                at,
            } => {
                if let Some(wf) = self.workflows.get_mut(workflow_id.as_str()) {
                    wf.current_step = next_step.clone();
                    wf.updated_at = *at;
                }
            }
            Event::WorkflowTransitioned {
                workflow_id,
                status,
                error,
                at,
            } => {
                if let Some(wf) = self.workflows.get_mut(workflow_id.as_str()) {
                    wf.status = *status;
                    wf.error = error.clone();
                    wf.updated_at = *at;
                }
                if *status == WorkflowStatus::PendingMerge {
                    if let Some(wf) = self.workflows.get(workflow_id.as_str()) {
                        if let Some(task) = self.tasks.get_mut(wf.task_id.as_str()) {
                            task.status = TaskStatus::PendingMerge;
                        }
                    }
                } else if *status == WorkflowStatus::Blocked {
                    if let Some(wf) = self.workflows.get(workflow_id.as_str()) {
                        if let Some(task) = self.tasks.get_mut(wf.task_id.as_str()) {
                            task.status = TaskStatus::Blocked;
                        }
                    }
                } else if *status == WorkflowStatus::Completed {
                    if let Some(wf) = self.workflows.get(workflow_id.as_str()) {
                        if let Some(task) = self.tasks.get_mut(wf.task_id.as_str()) {
                            task.status = TaskStatus::Closed;
                        }
                    }
                }
            }
            Event::WorkflowMergeReviewRequested {
                workflow_id,
                record,
                at,
            } => {
                if let Some(wf) = self.workflows.get_mut(workflow_id.as_str()) {
                    wf.merge_review = Some(record.clone());
                    wf.updated_at = *at;
                }
            }
            Event::WorkflowMergeReviewDecided {
                workflow_id,
                approved,
                reason,
                at,
            } => {
                if let Some(wf) = self.workflows.get_mut(workflow_id.as_str()) {
                    if let Some(review) = wf.merge_review.as_mut() {
                        review.decided_at = Some(*at);
                        review.approved = Some(*approved);
                        review.reason = reason.clone();
                    }
                    wf.updated_at = *at;
                    let task_id = wf.task_id.clone();
                    if *approved {
                        wf.status = WorkflowStatus::Running;
                        if let Some(task) = self.tasks.get_mut(task_id.as_str()) {
                            task.status = TaskStatus::InProgress;
                        }
                    } else {
                        wf.status = WorkflowStatus::Blocked;
                        if let Some(task) = self.tasks.get_mut(task_id.as_str()) {
                            task.status = TaskStatus::Blocked;
                        }
                    }
                }
            }
            Event::WorkflowRetired { workflow_id, .. } => {
                self.workflows.remove(workflow_id.as_str());
            }

            Event::QuestionDetected { question } => {
                self.questions
                    .entry(question.id.to_string())
                    .or_insert_with(|| question.clone());
            }
            Event::QuestionAnswered { id, answer, at } => {
                if let Some(q) = self.questions.get_mut(id.as_str()) {
                    q.answer = Some(answer.clone());
                    q.answered_at = Some(*at);
                }
            }
            Event::QuestionDelivered { id, at } => {
                if let Some(q) = self.questions.get_mut(id.as_str()) {
                    q.delivered_at = Some(*at);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
