// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess-backed `AgentAdapter`.
//!
//! Spawns the configured agent binary directly (no tmux, no session log
//! polling): the rendered prompt is the final argv entry, stdin is piped and
//! kept open for later question answers, stdout/stderr are read line-by-line
//! on two background tasks that forward each line to the output channel and
//! the step's ring buffer, and a third task races the child's exit against
//! the step timeout.

use super::ring_buffer::RingBuffer;
use super::{AgentAdapter, AgentError, AgentHandle, AgentOutcome, AgentSpawnConfig};
use async_trait::async_trait;
use coven_core::{AgentOutputLine, OutputStream, QuestionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

/// Returns the last path component of a command's program, for logging.
pub fn extract_binary_name(command: &[String]) -> &str {
    command
        .first()
        .map(|s| s.as_str())
        .unwrap_or("<unknown>")
        .rsplit('/')
        .next()
        .unwrap_or("<unknown>")
}

struct RunningStep {
    child: Arc<AsyncMutex<Child>>,
    seq: Arc<AtomicU64>,
    ring: Arc<Mutex<RingBuffer>>,
}

/// Spawns agent binaries as direct child processes.
#[derive(Clone, Default)]
pub struct ProcessAgentAdapter {
    steps: Arc<Mutex<HashMap<String, RunningStep>>>,
}

impl ProcessAgentAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentAdapter for ProcessAgentAdapter {
    async fn spawn(
        &self,
        config: AgentSpawnConfig,
        output_tx: mpsc::Sender<AgentOutputLine>,
        done_tx: mpsc::Sender<(String, AgentOutcome)>,
    ) -> Result<AgentHandle, AgentError> {
        let [program, args @ ..] = config.command.as_slice() else {
            return Err(AgentError::SpawnFailed("empty command".into()));
        };

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .arg(&config.prompt)
            .current_dir(&config.worktree_path)
            .envs(config.env.iter().cloned())
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentError::SpawnFailed(e.to_string()))?;
        let pid = child.id().unwrap_or(0);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // `child.stdin` is left open (never written to, never `take()`-n):
        // the prompt travels as the final argv entry per spec.md §4.6, and
        // stdin is reserved for `send_answer` to write a later question's
        // answer into the same running process.

        let ring = Arc::new(Mutex::new(RingBuffer::new()));
        let seq = Arc::new(AtomicU64::new(0));
        let step_task_id = config.step_task_id.clone();

        if let Some(stdout) = stdout {
            spawn_reader_task(
                step_task_id.clone(),
                OutputStream::Stdout,
                stdout,
                Arc::clone(&ring),
                Arc::clone(&seq),
                output_tx.clone(),
            );
        }
        if let Some(stderr) = stderr {
            spawn_reader_task(
                step_task_id.clone(),
                OutputStream::Stderr,
                stderr,
                Arc::clone(&ring),
                Arc::clone(&seq),
                output_tx,
            );
        }

        let child = Arc::new(AsyncMutex::new(child));
        self.steps.lock().insert(
            step_task_id.clone(),
            RunningStep {
                child: Arc::clone(&child),
                seq: Arc::clone(&seq),
                ring: Arc::clone(&ring),
            },
        );

        let timeout = config.timeout;
        let steps = Arc::clone(&self.steps);
        tokio::spawn(async move {
            let outcome = {
                let mut guard = child.lock().await;
                match tokio::time::timeout(timeout, guard.wait()).await {
                    Ok(Ok(status)) => AgentOutcome::Exited {
                        exit_code: status.code().unwrap_or(-1),
                    },
                    Ok(Err(_)) => AgentOutcome::Exited { exit_code: -1 },
                    Err(_elapsed) => {
                        let _ = guard.start_kill();
                        AgentOutcome::TimedOut
                    }
                }
            };
            steps.lock().remove(&step_task_id);
            let _ = done_tx.send((step_task_id, outcome)).await;
        });

        Ok(AgentHandle {
            step_task_id: config.step_task_id,
            pid,
        })
    }

    async fn send_answer(
        &self,
        step_task_id: &str,
        _question_id: &QuestionId,
        answer: &str,
    ) -> Result<(), AgentError> {
        let child = {
            let steps = self.steps.lock();
            steps
                .get(step_task_id)
                .map(|s| Arc::clone(&s.child))
                .ok_or_else(|| AgentError::NotRunning(step_task_id.to_string()))?
        };
        let mut guard = child.lock().await;
        let stdin = guard
            .stdin
            .as_mut()
            .ok_or_else(|| AgentError::SendFailed("stdin already closed".into()))?;
        stdin
            .write_all(format!("{answer}\n").as_bytes())
            .await
            .map_err(|e| AgentError::SendFailed(e.to_string()))
    }

    async fn kill(&self, step_task_id: &str) -> Result<(), AgentError> {
        let child = {
            let steps = self.steps.lock();
            steps
                .get(step_task_id)
                .map(|s| Arc::clone(&s.child))
                .ok_or_else(|| AgentError::NotRunning(step_task_id.to_string()))?
        };
        let mut guard = child.lock().await;
        guard
            .start_kill()
            .map_err(|e| AgentError::KillFailed(e.to_string()))
    }

    async fn tail(&self, step_task_id: &str) -> Vec<AgentOutputLine> {
        let ring = {
            let steps = self.steps.lock();
            steps.get(step_task_id).map(|s| Arc::clone(&s.ring))
        };
        match ring {
            Some(ring) => ring.lock().tail(),
            None => Vec::new(),
        }
    }
}

fn spawn_reader_task<R>(
    step_task_id: String,
    stream: OutputStream,
    reader: R,
    ring: Arc<Mutex<RingBuffer>>,
    seq: Arc<AtomicU64>,
    output_tx: mpsc::Sender<AgentOutputLine>,
) where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(data)) => {
                    let line = AgentOutputLine {
                        step_task_id: step_task_id.clone(),
                        seq: seq.fetch_add(1, Ordering::Relaxed) + 1,
                        at: chrono::Utc::now(),
                        stream,
                        data,
                    };
                    ring.lock().push(line.clone());
                    if output_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(step_task_id, error = %e, "agent output read failed");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
