// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `coven task` - the task catalog (spec.md §4.1 / §6.2 `/tasks*`).

use crate::client::DaemonClient;
use crate::commands::print_json;
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Create {
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        parent: Option<String>,
    },
    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        parent: Option<String>,
    },
    /// List only tasks ready to be claimed
    Ready,
    /// Show a single task
    Get { id: String },
    /// Update a task's title, body, or priority
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
    },
    /// Soft-delete a task
    Delete { id: String },
    /// Claim a task for a claimant
    Claim {
        id: String,
        #[arg(long, default_value = "cli")]
        claimant: String,
    },
    /// Forcibly reassign a task's claim
    Reclaim {
        id: String,
        #[arg(long, default_value = "cli")]
        claimant: String,
    },
    /// Release a task's claim back to open
    Release { id: String },
    /// Set a task's status directly
    SetStatus { id: String, status: String },
    /// Add tags to a task
    Tag { id: String, tags: Vec<String> },
    /// Remove tags from a task
    Untag { id: String, tags: Vec<String> },
    /// Change a task's parent
    Reparent {
        id: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// List a task's children
    Children { id: String },
    /// List a task's ancestors, nearest parent first
    Ancestors { id: String },
    /// List every descendant of a task
    Subtree { id: String },
    /// Show a task's audit history
    History { id: String },
    /// Show which grimoire would match this task
    GrimoireMatch { id: String },
    /// Apply one operation to a batch of tasks, all-or-nothing
    Bulk {
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
        #[command(subcommand)]
        op: BulkOpArg,
    },
}

#[derive(Subcommand)]
pub enum BulkOpArg {
    AddTags { tags: Vec<String> },
    RemoveTags { tags: Vec<String> },
    SetStatus { status: String },
    SetPriority { priority: i32 },
    Delete,
}

pub async fn run(args: TaskArgs, client: &DaemonClient) -> anyhow::Result<()> {
    match args.command {
        TaskCommand::Create {
            title,
            body,
            priority,
            tags,
            parent,
        } => {
            let value = client
                .post(
                    "/tasks",
                    Some(json!({
                        "title": title,
                        "body": body,
                        "priority": priority,
                        "tags": tags,
                        "parent": parent,
                    })),
                )
                .await?;
            print_json(&value);
        }
        TaskCommand::List {
            status,
            tag,
            parent,
        } => {
            let mut path = "/tasks".to_string();
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(format!("status={status}"));
            }
            if let Some(tag) = tag {
                query.push(format!("tag={tag}"));
            }
            if let Some(parent) = parent {
                query.push(format!("parent={parent}"));
            }
            if !query.is_empty() {
                path.push('?');
                path.push_str(&query.join("&"));
            }
            print_json(&client.get(&path).await?);
        }
        TaskCommand::Ready => {
            print_json(&client.get("/tasks/ready").await?);
        }
        TaskCommand::Get { id } => {
            print_json(&client.get(&format!("/tasks/{id}")).await?);
        }
        TaskCommand::Update {
            id,
            title,
            body,
            priority,
        } => {
            let value = client
                .patch(
                    &format!("/tasks/{id}"),
                    Some(json!({
                        "title": title,
                        "body": body,
                        "priority": priority,
                    })),
                )
                .await?;
            print_json(&value);
        }
        TaskCommand::Delete { id } => {
            client.delete(&format!("/tasks/{id}")).await?;
            println!("deleted {id}");
        }
        TaskCommand::Claim { id, claimant } => {
            let value = client
                .post(
                    &format!("/tasks/{id}/claim"),
                    Some(json!({ "claimant": claimant })),
                )
                .await?;
            print_json(&value);
        }
        TaskCommand::Reclaim { id, claimant } => {
            let value = client
                .post(
                    &format!("/tasks/{id}/reclaim"),
                    Some(json!({ "claimant": claimant })),
                )
                .await?;
            print_json(&value);
        }
        TaskCommand::Release { id } => {
            print_json(&client.post(&format!("/tasks/{id}/release"), None).await?);
        }
        TaskCommand::SetStatus { id, status } => {
            let value = client
                .post(
                    &format!("/tasks/{id}/status"),
                    Some(json!({ "status": status })),
                )
                .await?;
            print_json(&value);
        }
        TaskCommand::Tag { id, tags } => {
            let value = client
                .post(&format!("/tasks/{id}/tags"), Some(json!({ "tags": tags })))
                .await?;
            print_json(&value);
        }
        TaskCommand::Untag { id, tags } => {
            let value = client
                .delete_with_body(&format!("/tasks/{id}/tags"), json!({ "tags": tags }))
                .await?;
            print_json(&value);
        }
        TaskCommand::Reparent { id, parent } => {
            let value = client
                .post(
                    &format!("/tasks/{id}/reparent"),
                    Some(json!({ "parent": parent })),
                )
                .await?;
            print_json(&value);
        }
        TaskCommand::Children { id } => {
            print_json(&client.get(&format!("/tasks/{id}/children")).await?);
        }
        TaskCommand::Ancestors { id } => {
            print_json(&client.get(&format!("/tasks/{id}/ancestors")).await?);
        }
        TaskCommand::Subtree { id } => {
            print_json(&client.get(&format!("/tasks/{id}/subtree")).await?);
        }
        TaskCommand::History { id } => {
            print_json(&client.get(&format!("/tasks/{id}/history")).await?);
        }
        TaskCommand::GrimoireMatch { id } => {
            print_json(&client.get(&format!("/tasks/{id}/grimoire-match")).await?);
        }
        TaskCommand::Bulk { ids, op } => {
            let op_json = match op {
                BulkOpArg::AddTags { tags } => json!({ "type": "add_tags", "tags": tags }),
                BulkOpArg::RemoveTags { tags } => json!({ "type": "remove_tags", "tags": tags }),
                BulkOpArg::SetStatus { status } => json!({ "type": "set_status", "status": status }),
                BulkOpArg::SetPriority { priority } => {
                    json!({ "type": "set_priority", "priority": priority })
                }
                BulkOpArg::Delete => json!({ "type": "delete" }),
            };
            let value = client
                .post("/tasks/bulk", Some(json!({ "ids": ids, "op": op_json })))
                .await?;
            print_json(&value);
        }
    }
    Ok(())
}
