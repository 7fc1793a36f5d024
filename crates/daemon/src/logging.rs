// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `covend.log` setup: a size-rotated file appender plus a JSON-lines
//! `tracing` subscriber. Rotation happens once at startup, the same "shift
//! `.2`→`.3`, `.1`→`.2`, current→`.1`" scheme `ojd` uses, rather than
//! rotating mid-run.

use crate::config::Config;
use std::path::Path;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 7;

/// Rotates `covend.log` if it has grown past [`MAX_LOG_SIZE`], keeping up to
/// [`MAX_ROTATED_LOGS`] prior generations.
pub fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Installs a process-global JSON-lines `tracing` subscriber writing to
/// `config.log_path`. Returns the [`tracing_appender::non_blocking::WorkerGuard`]
/// that must be kept alive for the life of the process — dropping it stops
/// the background flush thread.
pub fn init(
    config: &Config,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    rotate_log_if_needed(&config.log_path);

    let file_name = config
        .log_path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty log path"))?;
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().expect("checked above"),
        file_name,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(non_blocking))
        .init();

    Ok(guard)
}
