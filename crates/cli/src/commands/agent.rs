// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `coven agent` - direct access to a running agent-step process
//! (spec.md §4.6 / §6.2 `/agents*`).

use crate::client::DaemonClient;
use crate::commands::print_json;
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Tail an agent step's output
    Output {
        step_task_id: String,
        /// Only show lines after this sequence number
        #[arg(long)]
        since: Option<u64>,
    },
    /// Kill an agent step's process
    Kill { step_task_id: String },
    /// Answer a question an agent is blocked on
    Respond {
        step_task_id: String,
        question_id: String,
        answer: String,
    },
}

pub async fn run(args: AgentArgs, client: &DaemonClient) -> anyhow::Result<()> {
    match args.command {
        AgentCommand::Output { step_task_id, since } => {
            let mut path = format!("/agents/{step_task_id}/output");
            if let Some(since) = since {
                path.push_str(&format!("?since={since}"));
            }
            print_json(&client.get(&path).await?);
        }
        AgentCommand::Kill { step_task_id } => {
            client
                .post(&format!("/agents/{step_task_id}/kill"), None)
                .await?;
            println!("killed {step_task_id}");
        }
        AgentCommand::Respond {
            step_task_id,
            question_id,
            answer,
        } => {
            client
                .post(
                    &format!("/agents/{step_task_id}/respond"),
                    Some(json!({ "question_id": question_id, "answer": answer })),
                )
                .await?;
            println!("answered {question_id}");
        }
    }
    Ok(())
}
