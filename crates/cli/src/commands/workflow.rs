// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `coven workflow` - workflow runs (spec.md §4.5 / §6.2 `/workflows*`).

use crate::client::DaemonClient;
use crate::commands::print_json;
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Args)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommand,
}

#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// List workflow runs, most recently started first
    List,
    /// Show a single workflow run
    Get { id: String },
    /// Print a workflow's durable JSONL transition log
    Log { id: String },
    /// Cancel a running workflow
    Cancel {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Re-run a blocked or failed workflow from its last completed step
    Retry { id: String },
    /// Approve a workflow's pending merge
    ApproveMerge {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Reject a workflow's pending merge
    RejectMerge {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
}

pub async fn run(args: WorkflowArgs, client: &DaemonClient) -> anyhow::Result<()> {
    match args.command {
        WorkflowCommand::List => {
            print_json(&client.get("/workflows").await?);
        }
        WorkflowCommand::Get { id } => {
            print_json(&client.get(&format!("/workflows/{id}")).await?);
        }
        WorkflowCommand::Log { id } => {
            let text = client.get_text(&format!("/workflows/{id}/log")).await?;
            print!("{text}");
        }
        WorkflowCommand::Cancel { id, reason } => {
            client
                .post(
                    &format!("/workflows/{id}/cancel"),
                    Some(json!({ "reason": reason })),
                )
                .await?;
            println!("cancelled {id}");
        }
        WorkflowCommand::Retry { id } => {
            client.post(&format!("/workflows/{id}/retry"), None).await?;
            println!("retrying {id}");
        }
        WorkflowCommand::ApproveMerge { id, reason } => {
            client
                .post(
                    &format!("/workflows/{id}/approve-merge"),
                    Some(json!({ "reason": reason })),
                )
                .await?;
            println!("approved merge for {id}");
        }
        WorkflowCommand::RejectMerge { id, reason } => {
            client
                .post(
                    &format!("/workflows/{id}/reject-merge"),
                    Some(json!({ "reason": reason })),
                )
                .await?;
            println!("rejected merge for {id}");
        }
    }
    Ok(())
}
