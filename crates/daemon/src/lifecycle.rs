// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown (spec.md §4.8): single-instance arbitration,
//! WAL replay, grimoire/spell/matcher loading, worktree orphan recovery, and
//! workflow resumption. Grounded on `oj-daemon`'s `lifecycle::startup`/
//! `shutdown` — same lock-then-bind-then-replay shape — generalized from a
//! single user-level state directory to one `.coven/` per workspace, and
//! from `oj`'s plain-JSON snapshot to the zstd `Checkpointer` storage grew
//! for this repo.

use crate::config::{self, Config};
use coven_adapters::agent::ProcessAgentAdapter;
use coven_core::{Clock, SystemClock, TaskId, UuidIdGen, WorkflowStatus, Worktree};
use coven_engine::{EventBus, Scheduler, TaskStore, WorkflowRunner};
use coven_grimoire::{GrimoireStore, MatcherConfig, SpellStore};
use coven_storage::{load_snapshot, Checkpointer, MaterializedState, Wal, WalError};
use coven_worktree::WorktreeManager;
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// How often the background checkpoint task snapshots state and shrinks the
/// WAL. Independent of the scheduler's own tick interval.
pub const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

pub type CovenScheduler = Scheduler<ProcessAgentAdapter, SystemClock, UuidIdGen>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("another covend is already running for this workspace (pid {0})")]
    AlreadyRunning(u32),

    #[error("failed to bind {0}: {1}")]
    BindFailed(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Wal(#[from] WalError),

    #[error(transparent)]
    Snapshot(#[from] coven_storage::SnapshotError),

    #[error(transparent)]
    Coven(#[from] coven_core::CovenError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything a running daemon needs kept alive: the held lock file (RAII
/// release on drop), the bound socket, and the fully wired scheduler.
pub struct StartupResult {
    pub config: Config,
    pub lock_file: File,
    pub listener: UnixListener,
    pub bus: EventBus,
    pub scheduler: CovenScheduler,
    pub orphans_recovered: Vec<TaskId>,
    pub workflows_resumed: usize,
}

/// Runs spec.md §4.8's 7-step startup sequence. On any failure after the
/// lock is held, on-disk state belongs to this half-started process and is
/// safe to leave for the next attempt to find and repair; we only skip
/// cleanup of the lock/socket/pid when the failure *is* that another daemon
/// already holds them.
pub async fn startup(config: Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create .coven/ and subdirectories; logging is initialized by the
    // caller before this runs, so it can capture lock-acquisition failures.
    config::ensure_dirs(&config)?;

    // 2. Acquire the single-instance lock. Open without truncating so a
    // failed `try_lock_exclusive` never wipes the live daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    if lock_file.try_lock_exclusive().is_err() {
        let pid = std::fs::read_to_string(&config.lock_path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        return Err(LifecycleError::AlreadyRunning(pid));
    }
    {
        let mut lock_file = &lock_file;
        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
        lock_file.flush()?;
    }

    // 3. Bind the Unix socket. A stale socket file from a prior, uncleanly
    // killed process (the lock above is what actually arbitrates, not this
    // file's mere presence) is removed before binding.
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 4. Open the task store: replay the WAL on top of the latest durable
    // snapshot, then load grimoires/spells/matcher config, seeding any
    // builtin missing from the user directories without overwriting ones
    // already there.
    let (state, processed_seq) = match load_snapshot(&config.snapshot_path)? {
        Some(snapshot) => (snapshot.state, snapshot.seq),
        None => (MaterializedState::default(), 0),
    };
    let mut wal = Wal::open(&config.wal_path, processed_seq)?;
    let mut state = state;
    for entry in wal.entries_after(processed_seq)? {
        state.apply_event(&entry.event);
    }
    let bus = EventBus::new(state, wal);

    GrimoireStore::materialize_defaults(&config.workspace)?;
    SpellStore::materialize_defaults(&config.workspace)?;
    let grimoires = GrimoireStore::load(&config.workspace)?;
    let spells = SpellStore::load(&config.workspace)?;
    let matcher = MatcherConfig::load(&config.workspace)?;

    // 5. Scan worktrees and recover orphans: ones belonging to a task whose
    // workflow isn't resuming (step 6 below decides that set) get dirty
    // checked — uncommitted changes or unmerged commits block the task for
    // manual resolution, otherwise the worktree and branch are discarded.
    let worktrees = WorktreeManager::new(&config.workspace);
    let running_task_ids: Vec<TaskId> = bus
        .snapshot()
        .workflows
        .values()
        .filter(|w| !w.status.is_terminal())
        .map(|w| w.task_id.clone())
        .collect();
    let orphans_recovered = recover_orphans(
        &bus,
        &worktrees,
        &running_task_ids,
        &config.options.default_branch,
    )
    .await?;

    // 6. Resume non-terminal workflow runs. The scheduler's own reconciliation
    // loop only launches *new* workflows from ready tasks, so runs already
    // in flight at the last shutdown or crash are restarted here instead.
    let runner = WorkflowRunner::new(
        bus.clone(),
        SystemClock,
        ProcessAgentAdapter::new(),
        worktrees.clone(),
        config.options.agent_command.clone(),
        config.options.default_branch.clone(),
    );
    let workflows_resumed = resume_workflows(&runner, &grimoires, &spells).await;

    // 7. Build the scheduler; the caller starts its reconciliation loop and
    // begins serving requests.
    let tasks = TaskStore::new(bus.clone(), SystemClock, UuidIdGen);
    let scheduler = Scheduler::new(
        tasks,
        runner,
        worktrees,
        grimoires,
        spells,
        matcher,
        UuidIdGen,
        "covend",
        config.options.default_branch.clone(),
    )
    .with_max_concurrent_agents(config.options.max_concurrent_agents)
    .with_stale_claim_timeout(config.options.stale_claim_timeout());

    info!(
        workspace = %config.workspace_name(),
        orphans = orphans_recovered.len(),
        resumed = workflows_resumed,
        "covend started"
    );

    Ok(StartupResult {
        config,
        lock_file,
        listener,
        bus,
        scheduler,
        orphans_recovered,
        workflows_resumed,
    })
}

/// Orphan recovery policy (spec.md §4.4): a worktree the scheduler isn't
/// about to resume is either blocked (dirty) or discarded (clean).
async fn recover_orphans(
    bus: &EventBus,
    worktrees: &WorktreeManager,
    running_task_ids: &[TaskId],
    default_branch: &str,
) -> Result<Vec<TaskId>, LifecycleError> {
    let mut blocked = Vec::new();
    for path in worktrees.find_orphans(running_task_ids).await? {
        let Some(task_id_str) = path.file_name().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let task_id = TaskId::new(task_id_str.clone());
        // The worktree's own base branch survives a restart in durable state
        // (set on `WorktreeCreated`); only a task with no such record left
        // falls back to the configured default.
        let base_branch = bus
            .snapshot()
            .worktrees
            .get(task_id.as_str())
            .map(|w| w.base_branch.clone())
            .unwrap_or_else(|| default_branch.to_string());
        let worktree = Worktree {
            task_id: task_id.clone(),
            path: path.clone(),
            branch: Worktree::branch_for(&task_id),
            base_branch,
            orphan: true,
        };
        let dirty = match worktrees.status(&worktree).await {
            Ok(counts) => counts.has_uncommitted_changes() || counts.has_unmerged_commits(),
            Err(err) => {
                warn!(task_id = %task_id, "failed to check orphan worktree status, treating as dirty: {err}");
                true
            }
        };

        let task_exists = bus.snapshot().get_task(task_id.as_str()).is_some();
        let at = SystemClock.now();
        if dirty {
            if task_exists {
                let _ = bus.publish(vec![coven_core::Event::TaskStatusChanged {
                    id: task_id.clone(),
                    status: coven_core::TaskStatus::Blocked,
                    at,
                }]);
            }
            let _ = bus.publish(vec![coven_core::Event::WorktreeOrphanRecovered {
                task_id: task_id.clone(),
                blocked: true,
                at,
            }]);
            warn!(task_id = %task_id, "recovered orphan worktree with uncommitted work, blocked task");
            blocked.push(task_id);
        } else {
            if let Err(err) = worktrees.remove(&worktree).await {
                warn!(task_id = %task_id, "failed to remove clean orphan worktree: {err}");
            }
            let _ = bus.publish(vec![coven_core::Event::WorktreeOrphanRecovered {
                task_id: task_id.clone(),
                blocked: false,
                at,
            }]);
            info!(task_id = %task_id, "discarded clean orphan worktree");
        }
    }
    Ok(blocked)
}

async fn resume_workflows(
    runner: &WorkflowRunner<ProcessAgentAdapter, SystemClock>,
    grimoires: &GrimoireStore,
    spells: &SpellStore,
) -> usize {
    let workflows: Vec<_> = runner
        .bus()
        .snapshot()
        .workflows
        .values()
        .filter(|w| w.status == WorkflowStatus::Running)
        .cloned()
        .collect();

    let mut resumed = 0;
    for workflow in workflows {
        let Some(grimoire) = grimoires.get(&workflow.grimoire_name).cloned() else {
            warn!(
                workflow_id = %workflow.id,
                grimoire = %workflow.grimoire_name,
                "cannot resume workflow: grimoire no longer exists"
            );
            continue;
        };
        let runner = runner.clone();
        let spells = spells.clone();
        let workflow_id = workflow.id.clone();
        tokio::spawn(async move {
            if let Err(err) = runner.run(&workflow_id, &grimoire, &spells).await {
                tracing::error!(workflow_id = %workflow_id, "resumed workflow run failed: {err}");
            }
        });
        resumed += 1;
    }
    resumed
}

/// Takes a checkpoint of current state and, once it is durably on disk,
/// shrinks the WAL to only the entries written after it. Never runs the
/// truncation before the checkpoint completes (`Checkpointer`'s own
/// invariant): a crash between these two steps just means the next startup
/// replays a few already-checkpointed events again, which `apply_event` is
/// idempotent enough to tolerate.
pub fn checkpoint_once(bus: &EventBus, checkpointer: &Checkpointer) {
    let seq = bus.wal().lock().write_seq();
    if seq == 0 || seq <= bus.wal().lock().processed_seq() {
        return;
    }
    let state = bus.snapshot();
    match checkpointer.checkpoint_sync(seq, &state) {
        Ok(result) => {
            let mut wal = bus.wal().lock();
            wal.mark_processed(result.seq);
            if let Err(err) = wal.truncate_before(result.seq) {
                warn!("failed to truncate wal after checkpoint: {err}");
            }
        }
        Err(err) => warn!("checkpoint failed: {err}"),
    }
}

/// Background task: checkpoints on a fixed interval until `shutdown` fires.
pub async fn checkpoint_task(
    bus: EventBus,
    checkpointer: Checkpointer,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        checkpoint_once(&bus, &checkpointer);
    }
}

/// Runs spec.md §4.8's 5-step shutdown sequence. Active agent processes are
/// asked to stop (SIGTERM, then SIGKILL after a grace period) by the caller
/// before this runs, via each `ProcessAgentAdapter::kill`; this function's
/// job is the durability tail: one final checkpoint, then releasing the
/// socket, PID file, and lock.
pub fn shutdown(config: &Config, bus: &EventBus, checkpointer: &Checkpointer) {
    checkpoint_once(bus, checkpointer);
    let _ = std::fs::remove_file(&config.socket_path);
    let _ = std::fs::remove_file(&config.lock_path);
    info!(workspace = %config.workspace_name(), "covend stopped");
}
