// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared daemon state handed to every HTTP handler and background task.

use crate::config::Config;
use crate::lifecycle::CovenScheduler;
use crate::notify::Notifier;
use coven_engine::EventBus;
use coven_storage::Checkpointer;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, Notify};

/// Cloneable handle threaded through axum's `Router` as extension state.
///
/// The scheduler is behind a `tokio::sync::Mutex` rather than owned outright
/// by its reconciliation loop: `Scheduler::tick` only needs `&self`, but
/// `reload_grimoires`/`reload_spells`/`reload_matcher` need `&mut self`, and
/// HTTP handlers need read access to the same live instance the loop is
/// ticking — so the loop briefly locks it each tick instead of holding it
/// for the daemon's entire lifetime via `Scheduler::run`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bus: EventBus,
    pub scheduler: Arc<Mutex<CovenScheduler>>,
    pub notifier: Notifier,
    pub checkpointer: Arc<Checkpointer>,
    pub start_time: Instant,
    pub shutdown_tx: watch::Sender<bool>,
    pub paused: Arc<AtomicBool>,
    /// Wakes the scheduler's reconciliation loop immediately after a task
    /// mutation instead of waiting out the tick interval (spec.md §4.7).
    pub wake: Arc<Notify>,
}
