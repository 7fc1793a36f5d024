// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects: side effects the engine's pure reducers ask the executor to carry out.
//!
//! Pure functions compute a `Vec<Effect>` from a state transition; the executor
//! performs them against the real world (child processes, git, the notifier) and
//! feeds resulting [`crate::event::Event`]s back into the log.

use crate::event::Event;
use crate::question::QuestionId;
use crate::task::TaskId;
use crate::workflow::{StepPath, WorkflowId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Effect {
    /// Emit an event into the event log, outside of a step-execution context
    /// (e.g. a scheduler-driven claim or a sweep).
    Emit { event: Event },

    /// Allocate a worktree for a task.
    CreateWorktree {
        task_id: TaskId,
        branch: String,
        base_branch: String,
    },

    /// Merge a worktree's branch into the feature branch (non-fast-forward).
    MergeWorktree {
        task_id: TaskId,
        feature_branch: String,
    },

    /// Remove a worktree and its branch. Best-effort; failures are logged, never fatal.
    RemoveWorktree { task_id: TaskId },

    /// Spawn the agent child process for an agent step.
    SpawnAgentStep {
        workflow_id: WorkflowId,
        step_path: StepPath,
        step_task_id: String,
        prompt: String,
        worktree_path: PathBuf,
        timeout: Duration,
    },

    /// Deliver a human answer to a running agent's stdin.
    SendAgentAnswer {
        step_task_id: String,
        question_id: QuestionId,
        answer: String,
    },

    /// Terminate a running agent step (timeout, cancellation, or daemon shutdown).
    KillAgentStep { step_task_id: String },

    /// Run a script step's command in the worktree.
    RunScriptStep {
        workflow_id: WorkflowId,
        step_path: StepPath,
        command: String,
        cwd: PathBuf,
        timeout: Duration,
    },

    /// Send a desktop/log notification (pending-merge, blocked, completed transitions).
    Notify { title: String, message: String },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Emit { .. } => "emit",
            Effect::CreateWorktree { .. } => "create_worktree",
            Effect::MergeWorktree { .. } => "merge_worktree",
            Effect::RemoveWorktree { .. } => "remove_worktree",
            Effect::SpawnAgentStep { .. } => "spawn_agent_step",
            Effect::SendAgentAnswer { .. } => "send_agent_answer",
            Effect::KillAgentStep { .. } => "kill_agent_step",
            Effect::RunScriptStep { .. } => "run_script_step",
            Effect::Notify { .. } => "notify",
        }
    }

    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Emit { event } => vec![("event", event.log_summary())],
            Effect::CreateWorktree { task_id, branch, .. } => {
                vec![("task_id", task_id.to_string()), ("branch", branch.clone())]
            }
            Effect::MergeWorktree {
                task_id,
                feature_branch,
            } => vec![
                ("task_id", task_id.to_string()),
                ("feature_branch", feature_branch.clone()),
            ],
            Effect::RemoveWorktree { task_id } => vec![("task_id", task_id.to_string())],
            Effect::SpawnAgentStep {
                workflow_id,
                step_task_id,
                worktree_path,
                ..
            } => vec![
                ("workflow_id", workflow_id.to_string()),
                ("step_task_id", step_task_id.clone()),
                ("worktree_path", worktree_path.display().to_string()),
            ],
            Effect::SendAgentAnswer {
                step_task_id,
                question_id,
                ..
            } => vec![
                ("step_task_id", step_task_id.clone()),
                ("question_id", question_id.to_string()),
            ],
            Effect::KillAgentStep { step_task_id } => {
                vec![("step_task_id", step_task_id.clone())]
            }
            Effect::RunScriptStep {
                workflow_id, cwd, ..
            } => vec![
                ("workflow_id", workflow_id.to_string()),
                ("cwd", cwd.display().to_string()),
            ],
            Effect::Notify { title, .. } => vec![("title", title.clone())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_name_and_fields_agree_on_shape() {
        let effect = Effect::RemoveWorktree {
            task_id: TaskId::new("T1"),
        };
        assert_eq!(effect.name(), "remove_worktree");
        assert_eq!(effect.fields(), vec![("task_id", "T1".to_string())]);
    }
}
