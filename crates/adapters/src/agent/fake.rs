// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent adapter for testing.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{AgentAdapter, AgentError, AgentHandle, AgentOutcome, AgentSpawnConfig};
use async_trait::async_trait;
use coven_core::{AgentOutputLine, QuestionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Recorded `spawn` call, for assertions.
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub step_task_id: String,
    pub command: Vec<String>,
    pub prompt: String,
}

struct FakeState {
    calls: Vec<AgentCall>,
    running: HashMap<String, mpsc::Sender<(String, AgentOutcome)>>,
    answers: Vec<(String, String)>,
    killed: Vec<String>,
}

/// In-memory `AgentAdapter` that records calls instead of spawning processes.
///
/// Tests drive completion explicitly via [`FakeAgentAdapter::complete`].
#[derive(Clone)]
pub struct FakeAgentAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeAgentAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                running: HashMap::new(),
                answers: Vec::new(),
                killed: Vec::new(),
            })),
        }
    }
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }

    pub fn killed(&self) -> Vec<String> {
        self.inner.lock().killed.clone()
    }

    pub fn answers(&self) -> Vec<(String, String)> {
        self.inner.lock().answers.clone()
    }

    /// Simulate the step's process ending, as `spawn`'s background task would.
    pub async fn complete(&self, step_task_id: &str, outcome: AgentOutcome) {
        let tx = self.inner.lock().running.remove(step_task_id);
        if let Some(tx) = tx {
            let _ = tx.send((step_task_id.to_string(), outcome)).await;
        }
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn spawn(
        &self,
        config: AgentSpawnConfig,
        _output_tx: mpsc::Sender<AgentOutputLine>,
        done_tx: mpsc::Sender<(String, AgentOutcome)>,
    ) -> Result<AgentHandle, AgentError> {
        let mut state = self.inner.lock();
        state.calls.push(AgentCall {
            step_task_id: config.step_task_id.clone(),
            command: config.command.clone(),
            prompt: config.prompt.clone(),
        });
        state.running.insert(config.step_task_id.clone(), done_tx);
        Ok(AgentHandle {
            step_task_id: config.step_task_id,
            pid: 0,
        })
    }

    async fn send_answer(
        &self,
        step_task_id: &str,
        _question_id: &QuestionId,
        answer: &str,
    ) -> Result<(), AgentError> {
        self.inner
            .lock()
            .answers
            .push((step_task_id.to_string(), answer.to_string()));
        Ok(())
    }

    async fn kill(&self, step_task_id: &str) -> Result<(), AgentError> {
        self.inner.lock().killed.push(step_task_id.to_string());
        Ok(())
    }

    async fn tail(&self, _step_task_id: &str) -> Vec<AgentOutputLine> {
        Vec::new()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
