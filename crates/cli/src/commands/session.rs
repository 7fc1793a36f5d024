// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `coven session` - pause and resume the scheduler's reconciliation loop
//! (spec.md §6.2 `/session*`) without stopping `covend` itself.

use crate::client::DaemonClient;
use crate::commands::print_json;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Resume scheduling new work
    Start,
    /// Pause scheduling new work (in-flight workflows keep running)
    Stop,
    /// Show whether the scheduler is paused
    Status,
}

pub async fn run(args: SessionArgs, client: &DaemonClient) -> anyhow::Result<()> {
    match args.command {
        SessionCommand::Start => {
            client.post("/session/start", None).await?;
            println!("scheduling resumed");
        }
        SessionCommand::Stop => {
            client.post("/session/stop", None).await?;
            println!("scheduling paused");
        }
        SessionCommand::Status => {
            print_json(&client.get("/session/status").await?);
        }
    }
    Ok(())
}
