// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting and stopping the `covend` child process. Grounded on
//! `oj-cli::daemon_process`'s own `find_ojd_binary`/`start_daemon_background`
//! pair: resolve the sibling binary next to this one (or `COVEND_PATH`),
//! spawn it fully detached from the CLI's stdio, then poll `/health` with
//! a short backoff instead of assuming instant readiness.

use crate::client::DaemonClient;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

const READY_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL: Duration = Duration::from_millis(50);

pub fn find_covend_binary() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("COVEND_PATH") {
        return Ok(PathBuf::from(path));
    }
    let current_exe = std::env::current_exe()?;
    let dir = current_exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("could not determine directory of the running binary"))?;
    let candidate = dir.join("covend");
    if candidate.is_file() {
        return Ok(candidate);
    }
    Ok(PathBuf::from("covend"))
}

/// Spawns `covend` fully detached (no inherited stdio) and waits for its
/// `/health` endpoint to respond before returning.
pub async fn start_and_wait_ready(
    workspace: &std::path::Path,
    socket_path: &std::path::Path,
) -> anyhow::Result<()> {
    let covend = find_covend_binary()?;
    Command::new(&covend)
        .arg(workspace)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| anyhow::anyhow!("failed to start covend ({}): {e}", covend.display()))?;

    let client = DaemonClient::new(socket_path.to_path_buf());
    let start = std::time::Instant::now();
    loop {
        if client.health().await {
            return Ok(());
        }
        if start.elapsed() > READY_TIMEOUT {
            anyhow::bail!("covend did not become ready within {READY_TIMEOUT:?}");
        }
        tokio::time::sleep(READY_POLL).await;
    }
}
