// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! coven - thin CLI front end for `covend`.
//!
//! Grounded on `oj-cli::main`'s top-level `Cli`/`Commands` split, narrowed
//! to the resource families `covend`'s HTTP API exposes (spec.md §1 scopes
//! the CLI as an interface-only external collaborator, not a feature to
//! build out in full).

use clap::{Parser, Subcommand};
use coven::client::DaemonClient;
use coven::commands::{agent, daemon, question, session, task, workflow};
use coven::workspace::current_workspace_root;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "coven",
    version,
    about = "Drive AI coding agents against a local git repository"
)]
struct Cli {
    /// Workspace root (defaults to the nearest ancestor with a `.coven/` directory)
    #[arg(short = 'C', long = "workspace", global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the covend background process
    Daemon(daemon::DaemonArgs),
    /// Manage tasks
    Task(task::TaskArgs),
    /// Manage workflow runs
    Workflow(workflow::WorkflowArgs),
    /// Interact with a running agent step
    Agent(agent::AgentArgs),
    /// Answer a detected question
    Question(question::QuestionArgs),
    /// Pause or resume the scheduler
    Session(session::SessionArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let workspace = match cli.workspace {
        Some(w) => w,
        None => current_workspace_root()?,
    };
    // Derive the socket path the same way `covend` derives it, rather than
    // hardcoding `.coven/covend.sock` a second time in this crate.
    let config = coven_daemon::Config::load(&workspace)?;
    let socket_path = config.socket_path.clone();

    match cli.command {
        Commands::Daemon(args) => daemon::run(args, &workspace, &socket_path).await,
        other => {
            let client = DaemonClient::new(socket_path.clone());
            if !client.health().await {
                anyhow::bail!(
                    "covend is not running for this workspace (run `coven daemon start` first)"
                );
            }
            match other {
                Commands::Task(args) => task::run(args, &client).await,
                Commands::Workflow(args) => workflow::run(args, &client).await,
                Commands::Agent(args) => agent::run(args, &client).await,
                Commands::Question(args) => question::run(args, &client).await,
                Commands::Session(args) => session::run(args, &client).await,
                Commands::Daemon(_) => unreachable!("handled above"),
            }
        }
    }
}
