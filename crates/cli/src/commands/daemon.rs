// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `coven daemon` - start, stop, and check on `covend` for the current
//! workspace. Grounded on `oj-cli::commands::daemon`'s start/stop/status
//! trio, minus the `--foreground`/orphan-listing surface that belongs to
//! the richer `oj` CLI this one isn't trying to replicate.

use crate::client::DaemonClient;
use crate::daemon_process;
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start covend in the background, waiting until it responds to /health
    Start,
    /// Ask covend to shut down
    Stop,
    /// Show whether covend is running and its uptime
    Status,
}

pub async fn run(args: DaemonArgs, workspace: &Path, socket_path: &Path) -> anyhow::Result<()> {
    match args.command {
        DaemonCommand::Start => start(workspace, socket_path).await,
        DaemonCommand::Stop => stop(socket_path).await,
        DaemonCommand::Status => status(socket_path).await,
    }
}

async fn start(workspace: &Path, socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::new(socket_path.to_path_buf());
    if client.health().await {
        println!("covend is already running for this workspace");
        return Ok(());
    }
    daemon_process::start_and_wait_ready(workspace, socket_path).await?;
    println!("covend started");
    Ok(())
}

async fn stop(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::new(socket_path.to_path_buf());
    if !client.health().await {
        println!("covend is not running for this workspace");
        return Ok(());
    }
    client.post("/shutdown", None).await?;
    println!("covend is shutting down");
    Ok(())
}

async fn status(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::new(socket_path.to_path_buf());
    if !client.health().await {
        println!("covend is not running for this workspace");
        return Ok(());
    }
    let value = client.get("/state").await?;
    crate::commands::print_json(&value);
    Ok(())
}
