// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler (spec.md §4.7): the reconciliation loop that turns ready tasks
//! into running workflows, up to `max_concurrent_agents`, and sweeps stale
//! claims. Ticks on a fixed interval or an explicit wake signal — the same
//! `tokio::select!` shape `oj-daemon`'s engine loop uses for its WAL reader
//! and shutdown signals, generalized from "process the next durable event"
//! to "reconcile ready work against running capacity".
//!
//! Concurrency is re-derived from durable state on every tick rather than
//! tracked as a separate in-memory counter: a daemon restart picks up
//! wherever the last tick left off instead of racing back up to the cap.

use crate::error::{EngineError, Result};
use crate::store::{TaskStore, DEFAULT_STALE_CLAIM_TIMEOUT};
use crate::workflow::WorkflowRunner;
use coven_adapters::agent::AgentAdapter;
use coven_core::{Clock, IdGen, Task, TaskFilter, TaskId, WorkflowId, WorkflowStatus};
use coven_grimoire::{resolve, GrimoireStore, MatcherConfig, SpellStore};
use coven_worktree::WorktreeManager;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{error, info, warn};

/// How often the reconciliation tick runs absent an explicit wake (spec.md §4.7).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default cap on workflows this scheduler instance runs at once (spec.md §4.7).
pub const DEFAULT_MAX_CONCURRENT_AGENTS: usize = 3;

/// What one reconciliation pass did, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub released_stale: Vec<TaskId>,
    pub launched: Vec<(TaskId, WorkflowId)>,
}

/// Turns ready tasks into running workflows. Owns the grimoire/spell/matcher
/// config it resolves new work against; the daemon's file watchers call
/// `reload_*` when `.coven/` config changes on disk.
#[derive(Clone)]
pub struct Scheduler<A: AgentAdapter, C: Clock, I: IdGen> {
    tasks: TaskStore<C, I>,
    runner: WorkflowRunner<A, C>,
    worktrees: WorktreeManager,
    grimoires: GrimoireStore,
    spells: SpellStore,
    matcher: MatcherConfig,
    ids: I,
    claimant: String,
    base_branch: String,
    max_concurrent_agents: usize,
    stale_claim_timeout: Duration,
    wake: Arc<Notify>,
    paused: Arc<AtomicBool>,
}

impl<A: AgentAdapter, C: Clock, I: IdGen> Scheduler<A, C, I> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: TaskStore<C, I>,
        runner: WorkflowRunner<A, C>,
        worktrees: WorktreeManager,
        grimoires: GrimoireStore,
        spells: SpellStore,
        matcher: MatcherConfig,
        ids: I,
        claimant: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        Self {
            tasks,
            runner,
            worktrees,
            grimoires,
            spells,
            matcher,
            ids,
            claimant: claimant.into(),
            base_branch: base_branch.into(),
            max_concurrent_agents: DEFAULT_MAX_CONCURRENT_AGENTS,
            stale_claim_timeout: DEFAULT_STALE_CLAIM_TIMEOUT,
            wake: Arc::new(Notify::new()),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_max_concurrent_agents(mut self, n: usize) -> Self {
        self.max_concurrent_agents = n;
        self
    }

    pub fn with_stale_claim_timeout(mut self, timeout: Duration) -> Self {
        self.stale_claim_timeout = timeout;
        self
    }

    /// A handle other components (the HTTP API, after a task mutation) use to
    /// wake the reconciliation loop instead of waiting out the tick interval.
    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Shared flag the daemon's session endpoints toggle: while paused,
    /// `tick` still sweeps stale claims but claims no new ready work (spec.md
    /// §6.2 session stop/start). Cheap to clone and check from outside the
    /// scheduler's own owning task.
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.paused)
    }

    pub fn reload_grimoires(&mut self, workspace: &Path) -> Result<()> {
        self.grimoires.reload(workspace)?;
        Ok(())
    }

    pub fn reload_spells(&mut self, workspace: &Path) -> Result<()> {
        self.spells.reload(workspace)?;
        Ok(())
    }

    pub fn reload_matcher(&mut self, workspace: &Path) -> Result<()> {
        self.matcher = MatcherConfig::load(workspace)?;
        Ok(())
    }

    /// Read-only access to the task store, for HTTP query handlers.
    pub fn tasks(&self) -> &TaskStore<C, I> {
        &self.tasks
    }

    /// Read-only access to the workflow runner, for HTTP query/action handlers.
    pub fn runner(&self) -> &WorkflowRunner<A, C> {
        &self.runner
    }

    /// Read-only access to the worktree manager, for HTTP merge-review handlers.
    pub fn worktrees(&self) -> &WorktreeManager {
        &self.worktrees
    }

    pub fn grimoires(&self) -> &GrimoireStore {
        &self.grimoires
    }

    pub fn spells(&self) -> &SpellStore {
        &self.spells
    }

    pub fn matcher(&self) -> &MatcherConfig {
        &self.matcher
    }

    /// Resolves the grimoire `task` would be matched against right now,
    /// without claiming it or starting a run — the `GET
    /// /tasks/{id}/grimoire-match` debug endpoint (spec.md §6.2).
    pub fn match_task(&self, task: &Task) -> coven_grimoire::MatchResult {
        resolve(
            task,
            &self.matcher,
            |name| self.grimoires.get(name).is_some(),
            self.ancestor_grimoire(task).as_deref(),
        )
    }

    /// Runs the reconciliation loop until `shutdown` reports `true`.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if let Err(err) = self.tick().await {
                warn!("reconciliation tick failed: {err}");
            }
        }
    }

    /// One reconciliation pass: sweep stale claims, then claim and launch
    /// ready tasks up to `max_concurrent_agents`. Pending-merge and blocked
    /// tasks need no action here — they surface through the event stream the
    /// daemon's SSE layer already observes (spec.md §4.7).
    pub async fn tick(&self) -> Result<TickReport> {
        let released_stale = self.tasks.sweep_stale_claims(self.stale_claim_timeout)?;
        if !released_stale.is_empty() {
            info!(count = released_stale.len(), "released stale claims");
        }

        let mut launched = Vec::new();
        if self.paused.load(Ordering::Relaxed) {
            return Ok(TickReport { released_stale, launched });
        }
        let mut active = self.active_workflow_count();
        if active >= self.max_concurrent_agents {
            return Ok(TickReport { released_stale, launched });
        }

        let ready = self.tasks.list(&TaskFilter {
            ready_only: true,
            ..Default::default()
        });

        for task in ready {
            if active >= self.max_concurrent_agents {
                break;
            }
            let claimed = match self.tasks.claim_with_timeout(
                task.id.as_str(),
                &self.claimant,
                self.stale_claim_timeout,
            ) {
                Ok(t) => t,
                Err(_) => continue,
            };
            match self.launch(&claimed).await {
                Ok(workflow_id) => {
                    launched.push((claimed.id.clone(), workflow_id));
                    active += 1;
                }
                Err(err) => {
                    warn!(task_id = %claimed.id, "failed to launch workflow: {err}");
                    let _ = self.tasks.release(claimed.id.as_str());
                }
            }
        }

        Ok(TickReport { released_stale, launched })
    }

    /// Counts in-progress workflows straight from durable state.
    fn active_workflow_count(&self) -> usize {
        self.runner
            .bus()
            .snapshot()
            .workflows
            .values()
            .filter(|w| w.status == WorkflowStatus::Running)
            .count()
    }

    /// Walks up `task`'s ancestor chain for the nearest already-resolved
    /// grimoire, for the matcher's inheritance step (spec.md §4.2).
    fn ancestor_grimoire(&self, task: &Task) -> Option<String> {
        let parent_id = task.parent.as_ref()?;
        let state = self.runner.bus().snapshot();
        let parent = state.get_task(parent_id.as_str())?;
        state
            .workflows
            .values()
            .filter(|w| w.task_id == parent.id)
            .max_by_key(|w| w.started_at)
            .map(|w| w.grimoire_name.clone())
            .or_else(|| self.ancestor_grimoire(parent))
    }

    async fn launch(&self, task: &Task) -> Result<WorkflowId> {
        let resolved = resolve(
            task,
            &self.matcher,
            |name| self.grimoires.get(name).is_some(),
            self.ancestor_grimoire(task).as_deref(),
        );
        let grimoire = self
            .grimoires
            .get(&resolved.grimoire)
            .ok_or_else(|| EngineError::GrimoireNotFound(resolved.grimoire.clone()))?
            .clone();

        let worktree = self.worktrees.create(&task.id, &self.base_branch).await?;
        let workflow_id = WorkflowId::new(self.ids.next());
        self.runner
            .start(workflow_id.clone(), &task.id, &grimoire.name, worktree.path.clone())?;

        let runner = self.runner.clone();
        let spells = self.spells.clone();
        let run_id = workflow_id.clone();
        tokio::spawn(async move {
            if let Err(err) = runner.run(&run_id, &grimoire, &spells).await {
                error!(workflow_id = %run_id, "workflow run failed: {err}");
            }
        });

        Ok(workflow_id)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
