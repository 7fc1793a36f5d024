// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent process supervision.
//!
//! The `AgentAdapter` trait spawns the external agent binary for a single
//! agent step, streams its stdout/stderr into a ring buffer and an output
//! channel for SSE fan-out, and reports how the step ended (exit, timeout,
//! or kill) on a completion channel.
//!
//! # ID hierarchy
//!
//! ```text
//! workflow_id        - the workflow this step belongs to
//!      └── step_task_id  - unique per agent-step invocation (also the process's key)
//! ```

mod process;
mod ring_buffer;

pub use process::{extract_binary_name, ProcessAgentAdapter};
pub use ring_buffer::RingBuffer;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentAdapter};

use async_trait::async_trait;
use coven_core::{AgentOutputLine, QuestionId};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from agent process operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("step not running: {0}")]
    NotRunning(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("kill failed: {0}")]
    KillFailed(String),
}

/// Configuration for spawning a new agent-step process.
#[derive(Debug, Clone)]
pub struct AgentSpawnConfig {
    /// Unique per-invocation key (also used to route answers and kills).
    pub step_task_id: String,
    /// Program and arguments, e.g. `["claude", "--print"]`.
    pub command: Vec<String>,
    /// Rendered prompt, appended as the final argument on spawn.
    pub prompt: String,
    /// Worktree directory the agent runs in.
    pub worktree_path: PathBuf,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Handle to a running agent-step process.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    pub step_task_id: String,
    pub pid: u32,
}

/// How an agent-step process ended.
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    Exited { exit_code: i32 },
    TimedOut,
    Killed,
}

/// Adapter for managing AI agent processes.
#[async_trait]
pub trait AgentAdapter: Clone + Send + Sync + 'static {
    /// Spawn the agent binary, stream output on `output_tx`, and report the
    /// outcome on `done_tx` once the process exits, is killed, or times out.
    async fn spawn(
        &self,
        config: AgentSpawnConfig,
        output_tx: mpsc::Sender<AgentOutputLine>,
        done_tx: mpsc::Sender<(String, AgentOutcome)>,
    ) -> Result<AgentHandle, AgentError>;

    /// Deliver a human answer to a running agent's stdin.
    async fn send_answer(
        &self,
        step_task_id: &str,
        question_id: &QuestionId,
        answer: &str,
    ) -> Result<(), AgentError>;

    /// Terminate a running agent-step process.
    async fn kill(&self, step_task_id: &str) -> Result<(), AgentError>;

    /// Snapshot of the ring buffer for a step, most recent lines last.
    async fn tail(&self, step_task_id: &str) -> Vec<AgentOutputLine>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
