// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: the single point through which every component mutates durable
//! state. Publishing applies each event to the in-memory [`MaterializedState`]
//! and appends it to the WAL before fanning it out to subscribers (SSE,
//! the workflow log). Grounded on `oj-daemon`'s `EventBus` (WAL-backed,
//! buffered, broadcast to the engine loop), generalized here so every
//! publisher (task store, workflow engine, scheduler) shares one instance
//! instead of a single engine-loop consumer.

use coven_core::Event;
use coven_storage::{MaterializedState, Wal, WalError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared, cloneable handle to the durable event log and its derived state.
#[derive(Clone)]
pub struct EventBus {
    state: Arc<Mutex<MaterializedState>>,
    wal: Arc<Mutex<Wal>>,
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(state: MaterializedState, wal: Wal) -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Self {
            state: Arc::new(Mutex::new(state)),
            wal: Arc::new(Mutex::new(wal)),
            tx,
        }
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        Arc::clone(&self.state)
    }

    /// Shared handle to the underlying WAL, for the daemon's periodic
    /// checkpoint task (needs `processed_seq`/`truncate_before` alongside a
    /// state snapshot to safely shrink the log once a snapshot is durable).
    pub fn wal(&self) -> Arc<Mutex<Wal>> {
        Arc::clone(&self.wal)
    }

    /// Read-only snapshot helper for callers that just need a clone of the
    /// current state (HTTP query handlers, the scheduler's ready-task scan).
    pub fn snapshot(&self) -> MaterializedState {
        self.state.lock().clone()
    }

    /// Subscribe to every event published from now on (SSE fan-out, the
    /// workflow JSONL logger).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Apply and durably persist one or more events, in order, as a single
    /// logical unit. Applied to state first (so callers observe the effect
    /// immediately under the same lock), appended to the WAL, flushed
    /// (durability point), then broadcast. Events are never partially
    /// applied: a WAL write failure still leaves the in-memory state
    /// consistent with what was appended (caller decides whether to retry).
    pub fn publish(&self, events: Vec<Event>) -> Result<(), WalError> {
        if events.is_empty() {
            return Ok(());
        }
        {
            let mut state = self.state.lock();
            for event in &events {
                state.apply_event(event);
            }
        }
        {
            let mut wal = self.wal.lock();
            for event in &events {
                wal.append(event)?;
            }
            wal.flush()?;
        }
        for event in events {
            let _ = self.tx.send(event);
        }
        Ok(())
    }
}
