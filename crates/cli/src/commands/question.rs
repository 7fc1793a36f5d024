// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `coven question` - answering a question the matcher detected in an
//! agent's output (spec.md §4.10 / §6.2 `/questions/{id}/answer`).

use crate::client::DaemonClient;
use crate::commands::print_json;
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Args)]
pub struct QuestionArgs {
    #[command(subcommand)]
    pub command: QuestionCommand,
}

#[derive(Subcommand)]
pub enum QuestionCommand {
    /// List detected questions, optionally filtered
    List {
        #[arg(long)]
        task_id: Option<String>,
        #[arg(long)]
        pending: bool,
    },
    /// Show a single question
    Get { id: String },
    /// Answer a pending question by id
    Answer { id: String, answer: String },
}

pub async fn run(args: QuestionArgs, client: &DaemonClient) -> anyhow::Result<()> {
    match args.command {
        QuestionCommand::List { task_id, pending } => {
            let mut path = "/questions".to_string();
            let mut query = Vec::new();
            if let Some(task_id) = task_id {
                query.push(format!("task_id={task_id}"));
            }
            if pending {
                query.push("pending=true".to_string());
            }
            if !query.is_empty() {
                path.push('?');
                path.push_str(&query.join("&"));
            }
            print_json(&client.get(&path).await?);
        }
        QuestionCommand::Get { id } => {
            print_json(&client.get(&format!("/questions/{id}")).await?);
        }
        QuestionCommand::Answer { id, answer } => {
            client
                .post(&format!("/questions/{id}/answer"), Some(json!({ "answer": answer })))
                .await?;
            println!("answered {id}");
        }
    }
    Ok(())
}
