// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin subprocess wrapper over `git`, mirroring the timeout-and-describe
//! pattern used for every externally-invoked process in this codebase.

use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for git worktree operations.
pub const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

/// Run a git subcommand with a timeout, returning its captured output.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting timeout
/// expiration into a descriptive error message. The child process is killed
/// automatically if the timeout elapses (via the tokio `Child` drop impl).
pub async fn run_git(
    cwd: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<Output, String> {
    let mut cmd = Command::new("git");
    cmd.current_dir(cwd).args(args);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("git {} failed: {io_err}", args.join(" "))),
        Err(_elapsed) => Err(format!(
            "git {} timed out after {}s",
            args.join(" "),
            timeout.as_secs()
        )),
    }
}

/// Runs a git subcommand and requires a zero exit status, returning stdout
/// as a lossy UTF-8 string.
pub async fn run_git_ok(cwd: &Path, args: &[&str], timeout: Duration) -> Result<String, String> {
    let output = run_git(cwd, args, timeout).await?;
    if !output.status.success() {
        return Err(format!(
            "git {} exited {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
