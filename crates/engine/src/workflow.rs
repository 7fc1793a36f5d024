// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow Engine: interprets a grimoire's steps against a task's worktree.
//!
//! Steps are data (agent, script, loop, merge), not a class hierarchy; `run()`
//! is a single recursive tree-walk over [`coven_core::Step`] that dispatches
//! on [`StepKind`] and folds each leaf's outcome into a [`Flow`]. Every
//! durable transition — a step starting, finishing, a loop iterating, a merge
//! suspending for review — goes through [`EventBus::publish`], so a crash
//! mid-run is just a `run()` call that resumes from `wf.current_step`.
//!
//! Crash-resume works because `previous` at the resume point can always be
//! reconstructed from `wf.step_results`'s most recently inserted entry
//! (`IndexMap` preserves insertion order), regardless of whether that step
//! sits inside a loop. Steps strictly before the resume point are trusted and
//! skipped outright; the loop (if any) containing the resume point is
//! re-entered and its in-flight iteration is redone for real, since loop body
//! results are keyed by step name and get overwritten each iteration — there
//! is no way to skip-replay an individual prior iteration's steps.

use crate::context::{build_context, step_result_to_value};
use crate::error::{EngineError, Result};
use crate::event_bus::EventBus;
use crate::json_extract::{extract_last_json_object, json_to_value};
use crate::question_router;
use coven_adapters::agent::{AgentAdapter, AgentOutcome, AgentSpawnConfig};
use coven_adapters::subprocess::{run_with_timeout, SCRIPT_STEP_TIMEOUT};
use coven_core::{
    AgentOutputLine, AgentStep, Clock, CovenError, Event, Grimoire, LoopStep, MergeReviewRecord,
    MergeStep, ScriptStep, Step, StepAction, StepKind, StepResult, Task, TaskId, Value,
    WorkflowId, WorkflowState, WorkflowStatus,
};
use coven_grimoire::{render, render_condition, RenderMode, SpellResolver};
use coven_worktree::WorktreeManager;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// How much of an agent step's accumulated output is re-scanned for a
/// pending question on each line received. Keeps detection O(1) per line
/// instead of O(output length) as a long-running step's buffer grows.
const QUESTION_TAIL_WINDOW: usize = 2000;

fn tail_window(s: &str) -> &str {
    if s.len() <= QUESTION_TAIL_WINDOW {
        return s;
    }
    let start = s.len() - QUESTION_TAIL_WINDOW;
    let start = (start..=s.len()).find(|&i| s.is_char_boundary(i)).unwrap_or(s.len());
    &s[start..]
}

/// Default timeout for an agent-step process when the grimoire doesn't set one.
pub const DEFAULT_AGENT_STEP_TIMEOUT: Duration = Duration::from_secs(1800);

/// The result of running one step, or a subtree of steps, propagated up
/// through the interpreter until something other than `Continue` is hit.
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Continue,
    ExitLoop,
    Fail(String),
    Block(String),
    Suspend,
}

enum MergeOutcome {
    Suspended,
    Completed(StepResult),
}

fn is_prefix(prefix: &[usize], path: &[usize]) -> bool {
    path.len() >= prefix.len() && path[..prefix.len()] == *prefix
}

fn max_iterations_flow(action: StepAction) -> Flow {
    match action {
        StepAction::Continue | StepAction::ExitLoop => Flow::Continue,
        StepAction::Fail => Flow::Fail("loop reached max_iterations".into()),
        StepAction::Block => Flow::Block("loop reached max_iterations".into()),
    }
}

fn result_flow(result: &StepResult) -> Flow {
    match result.action {
        StepAction::Continue => Flow::Continue,
        StepAction::ExitLoop => Flow::ExitLoop,
        StepAction::Fail => Flow::Fail(
            result
                .error
                .clone()
                .unwrap_or_else(|| result.summary.clone()),
        ),
        StepAction::Block => Flow::Block(
            result
                .error
                .clone()
                .unwrap_or_else(|| result.summary.clone()),
        ),
    }
}

/// Fixed arguments threaded through one `run()` call: what we're running and
/// against what, plus the crash-resume marker.
struct StepCursor<'a> {
    workflow_id: &'a WorkflowId,
    task: &'a Task,
    grimoire: &'a Grimoire,
    resolver: &'a dyn SpellResolver,
    resume_at: &'a [usize],
}

/// Runs one grimoire against one task's worktree, step by step, publishing
/// every transition through the shared [`EventBus`].
#[derive(Clone)]
pub struct WorkflowRunner<A: AgentAdapter, C: Clock> {
    bus: EventBus,
    clock: C,
    agents: A,
    worktrees: WorktreeManager,
    agent_command: Vec<String>,
    base_branch: String,
    output_tx: broadcast::Sender<AgentOutputLine>,
}

impl<A: AgentAdapter, C: Clock> WorkflowRunner<A, C> {
    pub fn new(
        bus: EventBus,
        clock: C,
        agents: A,
        worktrees: WorktreeManager,
        agent_command: Vec<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        let (output_tx, _rx) = broadcast::channel(1024);
        Self {
            bus,
            clock,
            agents,
            worktrees,
            agent_command,
            base_branch: base_branch.into(),
            output_tx,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Read-only access to the agent adapter, for HTTP handlers that tail,
    /// kill, or answer a running agent step directly (spec.md §6.2's
    /// `/agents*` surface) without going through a workflow transition.
    pub fn agents(&self) -> &A {
        &self.agents
    }

    /// Read-only access to the worktree manager, for HTTP handlers resolving
    /// a task's worktree path outside of a workflow launch.
    pub fn worktrees(&self) -> &WorktreeManager {
        &self.worktrees
    }

    /// Subscribes to an agent step's streaming output lines, for SSE fan-out.
    /// Ephemeral: never durable, unlike [`EventBus::subscribe`] (spec.md §3,
    /// agent output line).
    pub fn subscribe_output(&self) -> broadcast::Receiver<AgentOutputLine> {
        self.output_tx.subscribe()
    }

    fn workflow(&self, id: &WorkflowId) -> Result<WorkflowState> {
        self.bus
            .state()
            .lock()
            .get_workflow(id.as_str())
            .cloned()
            .ok_or_else(|| EngineError::Coven(CovenError::NotFound(id.to_string())))
    }

    fn task(&self, id: &TaskId) -> Result<Task> {
        self.bus
            .state()
            .lock()
            .get_task(id.as_str())
            .cloned()
            .ok_or_else(|| EngineError::Coven(CovenError::NotFound(id.to_string())))
    }

    /// Seeds a fresh workflow run and records it durably. The caller (the
    /// scheduler) owns id generation and worktree allocation.
    pub fn start(
        &self,
        id: WorkflowId,
        task_id: &TaskId,
        grimoire_name: &str,
        worktree_path: std::path::PathBuf,
    ) -> Result<WorkflowState> {
        let now = self.clock.now();
        let workflow = WorkflowState {
            id,
            task_id: task_id.clone(),
            grimoire_name: grimoire_name.to_string(),
            status: WorkflowStatus::Running,
            current_step: Vec::new(),
            worktree_path,
            started_at: now,
            updated_at: now,
            step_results: IndexMap::new(),
            step_outputs: IndexMap::new(),
            error: None,
            merge_review: None,
            loop_iterations: IndexMap::new(),
            loop_entries: IndexMap::new(),
        };
        self.bus
            .publish(vec![Event::WorkflowStarted {
                workflow: workflow.clone(),
            }])?;
        Ok(workflow)
    }

    pub fn cancel(&self, workflow_id: &WorkflowId, reason: Option<String>) -> Result<()> {
        let at = self.clock.now();
        self.bus.publish(vec![Event::WorkflowTransitioned {
            workflow_id: workflow_id.clone(),
            status: WorkflowStatus::Cancelled,
            error: reason,
            at,
        }])?;
        Ok(())
    }

    pub fn retire(&self, workflow_id: &WorkflowId) -> Result<()> {
        let at = self.clock.now();
        self.bus.publish(vec![Event::WorkflowRetired {
            workflow_id: workflow_id.clone(),
            at,
        }])?;
        Ok(())
    }

    /// Records a human merge-review decision. On approval, performs the
    /// actual git merge before the decision is durable, so a durable
    /// `approved: true` always means the merge already happened.
    pub async fn approve_merge(
        &self,
        workflow_id: &WorkflowId,
        approved: bool,
        reason: Option<String>,
    ) -> Result<()> {
        if approved {
            let wf = self.workflow(workflow_id)?;
            let worktree = self
                .worktrees
                .resolve_worktree(&wf.task_id, &self.base_branch);
            self.worktrees
                .merge(&worktree)
                .await
                .map_err(EngineError::Coven)?;
        }
        let at = self.clock.now();
        self.bus.publish(vec![Event::WorkflowMergeReviewDecided {
            workflow_id: workflow_id.clone(),
            approved,
            reason,
            at,
        }])?;
        Ok(())
    }

    /// Runs (or resumes) a workflow to completion, suspension (pending
    /// merge review), or terminal failure/block.
    pub async fn run(
        &self,
        workflow_id: &WorkflowId,
        grimoire: &Grimoire,
        resolver: &dyn SpellResolver,
    ) -> Result<()> {
        let wf = self.workflow(workflow_id)?;
        let task = self.task(&wf.task_id)?;
        let resume_at = wf.current_step.clone();
        let mut resuming = !resume_at.is_empty();
        let mut previous = if resuming {
            wf.step_results.values().next_back().map(step_result_to_value)
        } else {
            None
        };
        let cursor = StepCursor {
            workflow_id,
            task: &task,
            grimoire,
            resolver,
            resume_at: &resume_at,
        };
        let flow = self
            .run_steps(&cursor, &[], &grimoire.steps, &mut resuming, &mut previous, None)
            .await?;
        self.finish(workflow_id, flow).await
    }

    async fn finish(&self, workflow_id: &WorkflowId, flow: Flow) -> Result<()> {
        let at = self.clock.now();
        let event = match flow {
            Flow::Continue | Flow::ExitLoop => Event::WorkflowTransitioned {
                workflow_id: workflow_id.clone(),
                status: WorkflowStatus::Completed,
                error: None,
                at,
            },
            Flow::Fail(message) => Event::WorkflowTransitioned {
                workflow_id: workflow_id.clone(),
                status: WorkflowStatus::Failed,
                error: Some(message),
                at,
            },
            Flow::Block(message) => Event::WorkflowTransitioned {
                workflow_id: workflow_id.clone(),
                status: WorkflowStatus::Blocked,
                error: Some(message),
                at,
            },
            Flow::Suspend => return Ok(()),
        };
        self.bus.publish(vec![event])?;
        Ok(())
    }

    /// Walks one list of sibling steps (top-level, or one loop's body).
    /// `resuming` flips to `false` the moment we pass the step that was
    /// in-flight at crash time; everything before it is trusted and skipped.
    async fn run_steps(
        &self,
        cursor: &StepCursor<'_>,
        prefix: &[usize],
        steps: &[Step],
        resuming: &mut bool,
        previous: &mut Option<Value>,
        loop_entry: Option<&Value>,
    ) -> Result<Flow> {
        for (i, step) in steps.iter().enumerate() {
            // An external cancellation (daemon shutdown, session stop, the
            // `/workflows/{id}/cancel` endpoint) publishes `WorkflowTransitioned`
            // straight onto durable state without this run loop's involvement.
            // Checking status here, once per step, keeps a cancelled run from
            // clobbering that transition with further progress.
            if self.workflow(cursor.workflow_id)?.status != WorkflowStatus::Running {
                return Ok(Flow::Suspend);
            }

            let mut path = prefix.to_vec();
            path.push(i);

            if let StepKind::Loop(loop_step) = &step.kind {
                let redo = *resuming && is_prefix(&path, cursor.resume_at);
                if *resuming && !redo && path.as_slice() < cursor.resume_at {
                    // This loop already ran to completion before the crash;
                    // `previous` is already correct from the resume seed.
                    continue;
                }
                let flow = self
                    .run_loop(cursor, &path, loop_step, resuming, previous, loop_entry, redo)
                    .await?;
                match flow {
                    Flow::Continue => continue,
                    other => return Ok(other),
                }
            }

            if *resuming {
                if path.as_slice() < cursor.resume_at {
                    continue;
                }
                *resuming = false;
            }

            let flow = self.run_leaf(cursor, &path, step, previous, loop_entry).await?;
            match flow {
                Flow::Continue => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Continue)
    }

    /// Runs one loop step to completion (`ExitLoop`, max iterations, or a
    /// propagated failure), threading `previous` across iterations.
    #[allow(clippy::too_many_arguments)]
    async fn run_loop(
        &self,
        cursor: &StepCursor<'_>,
        path: &[usize],
        loop_step: &LoopStep,
        resuming: &mut bool,
        previous: &mut Option<Value>,
        loop_entry: Option<&Value>,
        redo_in_flight_iteration: bool,
    ) -> Result<Flow> {
        let key = WorkflowState::path_key(path);
        let entry_value = previous.clone().unwrap_or(Value::Null);
        let mut iteration = {
            let wf = self.workflow(cursor.workflow_id)?;
            wf.loop_iterations.get(&key).copied().unwrap_or(0)
        };
        let mut body_previous = previous.clone();
        let mut first_pass = true;

        let flow = loop {
            if iteration >= loop_step.max_iterations {
                break max_iterations_flow(loop_step.on_max_iterations);
            }
            if !(redo_in_flight_iteration && first_pass) {
                iteration += 1;
                let at = self.clock.now();
                self.bus.publish(vec![Event::WorkflowLoopIteration {
                    workflow_id: cursor.workflow_id.clone(),
                    step_path: path.to_vec(),
                    iteration,
                    at,
                }])?;
            }
            first_pass = false;

            let step_flow = Box::pin(self.run_steps(
                cursor,
                path,
                &loop_step.steps,
                resuming,
                &mut body_previous,
                Some(&entry_value),
            ))
            .await?;
            match step_flow {
                Flow::Continue => continue,
                Flow::ExitLoop => break Flow::Continue,
                other => break other,
            }
        };
        *previous = body_previous;
        Ok(flow)
    }

    /// Runs one agent, script, or merge step. Leaf step results are always
    /// recorded via [`Self::record_step`] except a merge suspension, which
    /// has nothing to record yet.
    async fn run_leaf(
        &self,
        cursor: &StepCursor<'_>,
        path: &[usize],
        step: &Step,
        previous: &mut Option<Value>,
        loop_entry: Option<&Value>,
    ) -> Result<Flow> {
        let wf = self.workflow(cursor.workflow_id)?;
        let ctx = build_context(cursor.task, &wf, cursor.grimoire, previous.as_ref(), loop_entry);

        if let Some(when) = &step.when {
            if !render_condition(when, &ctx)? {
                let result = StepResult::skipped_because_when_false();
                let next_previous = step_result_to_value(&result);
                let flow = self.record_step(cursor, path, &step.name, result).await?;
                *previous = Some(next_previous);
                return Ok(flow);
            }
        }

        if let StepKind::Merge(merge) = &step.kind {
            return match self.run_merge_step(cursor, merge, &wf).await? {
                MergeOutcome::Suspended => Ok(Flow::Suspend),
                MergeOutcome::Completed(result) => {
                    let next_previous = step_result_to_value(&result);
                    let flow = self.record_step(cursor, path, &step.name, result).await?;
                    *previous = Some(next_previous);
                    Ok(flow)
                }
            };
        }

        let at = self.clock.now();
        self.bus.publish(vec![Event::WorkflowStepStarted {
            workflow_id: cursor.workflow_id.clone(),
            step_path: path.to_vec(),
            step_name: step.name.clone(),
            at,
        }])?;

        let result = match &step.kind {
            StepKind::Agent(agent) => self.execute_agent_step(cursor, path, agent, &ctx).await?,
            StepKind::Script(script) => self.execute_script_step(cursor, &wf, script, &ctx).await?,
            StepKind::Merge(_) | StepKind::Loop(_) => {
                unreachable!("merge and loop steps are dispatched above / in run_steps")
            }
        };

        let next_previous = step_result_to_value(&result);
        let flow = self.record_step(cursor, path, &step.name, result).await?;
        *previous = Some(next_previous);
        Ok(flow)
    }

    /// Emits `WorkflowStepCompleted` and `WorkflowStepAdvanced` as a single
    /// atomic publish, so a WAL flush never leaves a step recorded without
    /// current_step having moved past it.
    async fn record_step(
        &self,
        cursor: &StepCursor<'_>,
        path: &[usize],
        step_name: &str,
        result: StepResult,
    ) -> Result<Flow> {
        let at = self.clock.now();
        let flow = result_flow(&result);
        let mut next_step = path.to_vec();
        if let Some(last) = next_step.last_mut() {
            *last += 1;
        }
        self.bus.publish(vec![
            Event::WorkflowStepCompleted {
                workflow_id: cursor.workflow_id.clone(),
                step_name: step_name.to_string(),
                result,
                at,
            },
            Event::WorkflowStepAdvanced {
                workflow_id: cursor.workflow_id.clone(),
                next_step,
                at,
            },
        ])?;
        Ok(flow)
    }

    async fn run_merge_step(
        &self,
        cursor: &StepCursor<'_>,
        merge: &MergeStep,
        wf: &WorkflowState,
    ) -> Result<MergeOutcome> {
        let decided = match &wf.merge_review {
            Some(record) if record.decided_at.is_some() => record.approved,
            _ => None,
        };

        if let Some(approved) = decided {
            return Ok(MergeOutcome::Completed(if approved {
                StepResult {
                    success: true,
                    exit_code: None,
                    summary: "merge approved".into(),
                    outputs: IndexMap::new(),
                    raw_output: String::new(),
                    skipped: false,
                    duration_ms: 0,
                    error: None,
                    action: StepAction::Continue,
                }
            } else {
                StepResult {
                    success: false,
                    exit_code: None,
                    summary: "merge rejected".into(),
                    outputs: IndexMap::new(),
                    raw_output: String::new(),
                    skipped: false,
                    duration_ms: 0,
                    error: Some("merge review was rejected".into()),
                    action: StepAction::Block,
                }
            }));
        }

        if !merge.require_review {
            let worktree = self
                .worktrees
                .resolve_worktree(&wf.task_id, &self.base_branch);
            let start = self.clock.now();
            let outcome = self.worktrees.merge(&worktree).await;
            let duration_ms = (self.clock.now() - start).num_milliseconds().max(0) as u64;
            return Ok(MergeOutcome::Completed(match outcome {
                Ok(()) => StepResult {
                    success: true,
                    exit_code: None,
                    summary: "merged".into(),
                    outputs: IndexMap::new(),
                    raw_output: String::new(),
                    skipped: false,
                    duration_ms,
                    error: None,
                    action: StepAction::Continue,
                },
                Err(CovenError::MergeConflict(files)) => StepResult {
                    success: false,
                    exit_code: None,
                    summary: "merge conflict".into(),
                    outputs: IndexMap::new(),
                    raw_output: files.join("\n"),
                    skipped: false,
                    duration_ms,
                    error: Some(format!("merge conflict in {} file(s)", files.len())),
                    action: StepAction::Block,
                },
                Err(err) => StepResult {
                    success: false,
                    exit_code: None,
                    summary: "merge failed".into(),
                    outputs: IndexMap::new(),
                    raw_output: String::new(),
                    skipped: false,
                    duration_ms,
                    error: Some(err.to_string()),
                    action: StepAction::Fail,
                },
            }));
        }

        let at = self.clock.now();
        let record = MergeReviewRecord {
            requested_at: at,
            decided_at: None,
            approved: None,
            reason: None,
        };
        self.bus.publish(vec![
            Event::WorkflowMergeReviewRequested {
                workflow_id: cursor.workflow_id.clone(),
                record,
                at,
            },
            Event::WorkflowTransitioned {
                workflow_id: cursor.workflow_id.clone(),
                status: WorkflowStatus::PendingMerge,
                error: None,
                at,
            },
        ])?;
        Ok(MergeOutcome::Suspended)
    }

    async fn execute_agent_step(
        &self,
        cursor: &StepCursor<'_>,
        path: &[usize],
        agent: &AgentStep,
        ctx: &Value,
    ) -> Result<StepResult> {
        let wf = self.workflow(cursor.workflow_id)?;
        let mut local_ctx = ctx.clone();
        for (key, expr) in &agent.input {
            let rendered = render(expr, ctx, RenderMode::Plain, true, cursor.resolver)?;
            if let Some(map) = local_ctx.as_map_mut() {
                map.insert(key.clone(), Value::String(rendered));
            }
        }

        let template = if coven_core::spell::is_inline_spell(&agent.spell) {
            agent.spell.clone()
        } else {
            cursor
                .resolver
                .resolve(&agent.spell)
                .ok_or_else(|| EngineError::Coven(CovenError::SpellNotFound(agent.spell.clone())))?
        };
        let prompt = render(&template, &local_ctx, RenderMode::Plain, true, cursor.resolver)?;

        let step_task_id = format!(
            "{}:{}",
            cursor.workflow_id.as_str(),
            WorkflowState::path_key(path)
        );
        let timeout = agent.timeout.unwrap_or(DEFAULT_AGENT_STEP_TIMEOUT);
        let config = AgentSpawnConfig {
            step_task_id: step_task_id.clone(),
            command: self.agent_command.clone(),
            prompt,
            worktree_path: wf.worktree_path.clone(),
            env: Vec::new(),
            timeout,
        };

        let (output_tx, mut output_rx) = mpsc::channel(256);
        let (done_tx, mut done_rx) = mpsc::channel(1);
        let raw_output = Arc::new(Mutex::new(String::new()));
        let collector = Arc::clone(&raw_output);
        let bus = self.bus.clone();
        let clock = self.clock.clone();
        let sse_tx = self.output_tx.clone();
        let task_id = wf.task_id.clone();
        let drain = tokio::spawn(async move {
            while let Some(line) = output_rx.recv().await {
                let accumulated = {
                    let mut buf = collector.lock();
                    buf.push_str(&line.data);
                    buf.clone()
                };
                let _ = sse_tx.send(line);
                if let Err(err) = question_router::detect(
                    &bus,
                    &clock,
                    &task_id,
                    &step_task_id,
                    tail_window(&accumulated),
                ) {
                    tracing::warn!("question detection failed for {step_task_id}: {err}");
                }
            }
        });

        let start = self.clock.now();
        let spawn_result = self.agents.spawn(config, output_tx, done_tx).await;
        let handle = match spawn_result {
            Ok(handle) => handle,
            Err(err) => {
                drain.abort();
                return Ok(StepResult {
                    success: false,
                    exit_code: None,
                    summary: "agent spawn failed".into(),
                    outputs: IndexMap::new(),
                    raw_output: String::new(),
                    skipped: false,
                    duration_ms: 0,
                    error: Some(err.to_string()),
                    action: StepAction::Fail,
                });
            }
        };
        let outcome = done_rx.recv().await;
        let _ = drain.await;
        drop(handle);

        let duration_ms = (self.clock.now() - start).num_milliseconds().max(0) as u64;
        let raw_output = Arc::try_unwrap(raw_output)
            .map(|m| m.into_inner())
            .unwrap_or_default();

        Ok(match outcome {
            Some((_, AgentOutcome::Exited { exit_code: 0 })) => {
                match extract_last_json_object(&raw_output) {
                    Some(serde_json::Value::Object(map)) => {
                        let success = map.get("success").and_then(|v| v.as_bool()).unwrap_or(true);
                        let summary = map
                            .get("summary")
                            .and_then(|v| v.as_str())
                            .unwrap_or("")
                            .to_string();
                        let mut outputs = IndexMap::new();
                        for (k, v) in &map {
                            if k == "success" || k == "summary" {
                                continue;
                            }
                            outputs.insert(k.clone(), json_to_value(v));
                        }
                        StepResult {
                            success,
                            exit_code: Some(0),
                            summary,
                            outputs,
                            raw_output,
                            skipped: false,
                            duration_ms,
                            error: if success {
                                None
                            } else {
                                Some("agent reported failure".into())
                            },
                            action: if success {
                                StepAction::Continue
                            } else {
                                StepAction::Fail
                            },
                        }
                    }
                    _ => StepResult {
                        success: true,
                        exit_code: Some(0),
                        summary: String::new(),
                        outputs: IndexMap::new(),
                        raw_output,
                        skipped: false,
                        duration_ms,
                        error: None,
                        action: StepAction::Continue,
                    },
                }
            }
            Some((_, AgentOutcome::Exited { exit_code })) => StepResult {
                success: false,
                exit_code: Some(exit_code),
                summary: "agent exited with error".into(),
                outputs: IndexMap::new(),
                raw_output,
                skipped: false,
                duration_ms,
                error: Some(format!("agent exited with status {exit_code}")),
                action: StepAction::Fail,
            },
            Some((_, AgentOutcome::TimedOut)) => StepResult {
                success: false,
                exit_code: None,
                summary: "agent step timed out".into(),
                outputs: IndexMap::new(),
                raw_output,
                skipped: false,
                duration_ms,
                error: Some(format!("agent step timed out after {}s", timeout.as_secs())),
                action: StepAction::Fail,
            },
            Some((_, AgentOutcome::Killed)) => StepResult {
                success: false,
                exit_code: None,
                summary: "agent step killed".into(),
                outputs: IndexMap::new(),
                raw_output,
                skipped: false,
                duration_ms,
                error: Some("agent step was killed".into()),
                action: StepAction::Fail,
            },
            None => StepResult {
                success: false,
                exit_code: None,
                summary: "agent supervisor channel closed".into(),
                outputs: IndexMap::new(),
                raw_output,
                skipped: false,
                duration_ms,
                error: Some("lost contact with agent supervisor".into()),
                action: StepAction::Fail,
            },
        })
    }

    async fn execute_script_step(
        &self,
        cursor: &StepCursor<'_>,
        wf: &WorkflowState,
        script: &ScriptStep,
        ctx: &Value,
    ) -> Result<StepResult> {
        let rendered = render(&script.command, ctx, RenderMode::ShellQuoted, true, cursor.resolver)?;
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(&rendered).current_dir(&wf.worktree_path);
        let timeout = script.timeout.unwrap_or(SCRIPT_STEP_TIMEOUT);

        let start = self.clock.now();
        let outcome = run_with_timeout(cmd, timeout, "script step").await;
        let duration_ms = (self.clock.now() - start).num_milliseconds().max(0) as u64;

        Ok(match outcome {
            Ok(output) => {
                let success = output.status.success();
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let raw_output = format!("{stdout}{stderr}");
                let summary = raw_output
                    .lines()
                    .next_back()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                let action = if success {
                    StepAction::from(script.on_success)
                } else {
                    StepAction::from(script.on_fail)
                };
                StepResult {
                    success,
                    exit_code: output.status.code(),
                    summary,
                    outputs: IndexMap::new(),
                    raw_output,
                    skipped: false,
                    duration_ms,
                    error: if success {
                        None
                    } else {
                        Some(format!(
                            "script exited with status {:?}",
                            output.status.code()
                        ))
                    },
                    action,
                }
            }
            Err(message) => StepResult {
                success: false,
                exit_code: None,
                summary: "script step failed to run".into(),
                outputs: IndexMap::new(),
                raw_output: String::new(),
                skipped: false,
                duration_ms,
                error: Some(message),
                action: StepAction::Fail,
            },
        })
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
