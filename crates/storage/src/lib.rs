// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Event-sourced storage for Coven: the write-ahead log, the materialized
//! state it replays into, and zstd-compressed checkpointing for fast restart.

mod checkpoint;
mod migration;
mod snapshot;
mod state;
mod wal;

/// Current on-disk snapshot schema version, bumped whenever
/// [`MaterializedState`]'s shape changes in a way that needs a [`migration::Migration`].
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

pub use checkpoint::{
    CheckpointError, CheckpointHandle, CheckpointResult, CheckpointWriter, Checkpointer,
    FsCheckpointWriter, load_snapshot,
};
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use snapshot::{Snapshot, SnapshotError};
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry, WalError};
