// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coven Daemon (covend)
//!
//! Per-workspace background process that owns the scheduler, the workflow
//! engine, and the HTTP/SSE API (spec.md §4.8). Grounded on `ojd`'s
//! `main.rs`: info-flag handling before any lock is acquired, a startup
//! marker written synchronously to the log before tracing is installed, and
//! a single `tokio::select!` loop tying the scheduler, HTTP listener, signal
//! handlers, and checkpoint/reload background tasks to one shutdown signal.

use std::path::PathBuf;
use std::time::Duration;

use coven_daemon::lifecycle::{self, LifecycleError};
use coven_daemon::{config_watch, http, logging, notify, Config};
use tokio::net::UnixListener as TokioUnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut workspace: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("covend {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            other if other.starts_with('-') => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: covend [WORKSPACE] [--help | --version]");
                std::process::exit(1);
            }
            other => workspace = Some(PathBuf::from(other)),
        }
    }
    let workspace = match workspace {
        Some(w) => w,
        None => std::env::current_dir()?,
    };

    let config = Config::load(&workspace)?;
    let log_guard = logging::init(&config)?;
    info!(workspace = %config.workspace_name(), "starting covend");

    let startup = match lifecycle::startup(config).await {
        Ok(s) => s,
        Err(LifecycleError::AlreadyRunning(pid)) => {
            eprintln!("covend is already running for this workspace (pid {pid})");
            drop(log_guard);
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start covend: {e}");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let lifecycle::StartupResult {
        config,
        lock_file,
        listener,
        bus,
        scheduler,
        orphans_recovered,
        workflows_resumed,
    } = startup;
    let config = std::sync::Arc::new(config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let checkpointer = std::sync::Arc::new(coven_storage::Checkpointer::new(config.snapshot_path.clone()));
    let checkpoint_task_checkpointer =
        coven_storage::Checkpointer::new(config.snapshot_path.clone());
    let state = coven_daemon::AppState {
        config: std::sync::Arc::clone(&config),
        bus: bus.clone(),
        wake: scheduler.wake_handle(),
        paused: scheduler.pause_handle(),
        scheduler: std::sync::Arc::new(tokio::sync::Mutex::new(scheduler)),
        notifier: notify::Notifier::from_env(),
        checkpointer: std::sync::Arc::clone(&checkpointer),
        start_time: std::time::Instant::now(),
        shutdown_tx: shutdown_tx.clone(),
    };

    info!(
        orphans_recovered = orphans_recovered.len(),
        workflows_resumed, "covend ready"
    );

    // Reconciliation loop: locks the scheduler only for the duration of one
    // tick, so HTTP handlers that need `&mut Scheduler` (grimoire/spell/
    // matcher reload, the config watcher below) are never starved by a tick
    // that never ends (state.rs's `AppState::scheduler` doc comment).
    let tick_period = config.options.poll_interval();
    let wake = state.wake.clone();
    {
        let state = state.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = wake.notified() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                let mut scheduler = state.scheduler.lock().await;
                if let Err(err) = scheduler.tick().await {
                    tracing::warn!("reconciliation tick failed: {err}");
                }
            }
        });
    }

    tokio::spawn(config_watch::run(state.clone(), shutdown_rx.clone()));
    tokio::spawn(lifecycle::checkpoint_task(
        bus.clone(),
        checkpoint_task_checkpointer,
        shutdown_rx.clone(),
    ));
    tokio::spawn(notify::run(bus.clone(), state.notifier.clone()));

    let app = http::router(state.clone());
    let std_listener: std::os::unix::net::UnixListener = listener.into_std()?;
    std_listener.set_nonblocking(true)?;
    let listener = TokioUnixListener::from_std(std_listener)?;

    let mut http_shutdown_rx = shutdown_rx.clone();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = http_shutdown_rx.changed().await;
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = serve => {
            if let Err(err) = result {
                error!("http server error: {err}");
            }
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
            let _ = shutdown_tx.send(true);
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
            let _ = shutdown_tx.send(true);
        }
    }
    let _ = shutdown_tx.send(true);

    // Give background tasks a moment to observe the shutdown signal before
    // the final checkpoint and lock release.
    tokio::time::sleep(Duration::from_millis(50)).await;
    lifecycle::shutdown(&config, &bus, &checkpointer);
    drop(lock_file);
    drop(log_guard);
    Ok(())
}

fn print_help() {
    println!("covend {}", env!("CARGO_PKG_VERSION"));
    println!("Coven daemon - drives AI coding agents against a local repository");
    println!();
    println!("USAGE:");
    println!("    covend [WORKSPACE]");
    println!();
    println!("covend is typically started by the `coven` CLI and should not");
    println!("be invoked directly. WORKSPACE defaults to the current directory.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}
