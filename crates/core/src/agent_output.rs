// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent output lines. Ephemeral: owned by the Agent Supervisor's ring buffer,
//! broadcast over SSE, and dropped once the step completes — never written to the WAL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutputLine {
    pub step_task_id: String,
    /// Monotonic, contiguous from 1, per step-task-id.
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub stream: OutputStream,
    pub data: String,
}
