// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot reload for `.coven/grimoires/`, `.coven/spells/`, and
//! `.coven/grimoire-matchers.yaml` (spec.md §4.2: "Matcher config is
//! reloaded when its file changes"). Polls mtimes on a short interval
//! rather than pulling in an OS file-notification crate — the directories
//! involved are tiny and checked once a second, so the cost is negligible
//! and the daemon's dependency footprint stays the same as the teacher's.

use crate::state::AppState;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Latest mtime across every regular file directly inside `dir` (and `dir`
/// itself, so a rename or delete is also observed), or `None` if it doesn't
/// exist yet.
fn dir_fingerprint(dir: &Path) -> Option<SystemTime> {
    let mut latest = std::fs::metadata(dir).ok()?.modified().ok();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                latest = Some(latest.map_or(modified, |l| l.max(modified)));
            }
        }
    }
    latest
}

fn file_fingerprint(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

#[derive(Default)]
struct Fingerprints {
    grimoires: Option<SystemTime>,
    spells: Option<SystemTime>,
    matcher: Option<SystemTime>,
}

impl Fingerprints {
    fn capture(grimoires_dir: &Path, spells_dir: &Path, matcher_path: &Path) -> Self {
        Self {
            grimoires: dir_fingerprint(grimoires_dir),
            spells: dir_fingerprint(spells_dir),
            matcher: file_fingerprint(matcher_path),
        }
    }
}

/// Runs until `shutdown` reports true, diffing fingerprints every
/// [`POLL_INTERVAL`] and reloading whichever store changed. Active
/// workflows keep the grimoire they already resolved — only new `Scheduler`
/// lookups see the reload (spec.md §4.2).
pub async fn run(state: AppState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let workspace = state.config.workspace.clone();
    let mut seen = Fingerprints::capture(
        &state.config.grimoires_dir,
        &state.config.spells_dir,
        &state.config.matcher_path,
    );

    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let now = Fingerprints::capture(
            &state.config.grimoires_dir,
            &state.config.spells_dir,
            &state.config.matcher_path,
        );

        if now.grimoires != seen.grimoires {
            reload(&state, &workspace, "grimoires", |s| s.reload_grimoires(&workspace)).await;
        }
        if now.spells != seen.spells {
            reload(&state, &workspace, "spells", |s| s.reload_spells(&workspace)).await;
        }
        if now.matcher != seen.matcher {
            reload(&state, &workspace, "grimoire-matchers.yaml", |s| {
                s.reload_matcher(&workspace)
            })
            .await;
        }
        seen = now;
    }
}

async fn reload(
    state: &AppState,
    _workspace: &PathBuf,
    what: &str,
    f: impl FnOnce(&mut crate::lifecycle::CovenScheduler) -> coven_engine::Result<()>,
) {
    let mut scheduler = state.scheduler.lock().await;
    match f(&mut scheduler) {
        Ok(()) => info!("reloaded {what} after on-disk change"),
        Err(err) => warn!("failed to reload {what}: {err}"),
    }
}

#[cfg(test)]
#[path = "config_watch_tests.rs"]
mod tests;
