// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workspace daemon configuration: the fixed `.coven/` layout (spec.md
//! §6.1) plus `config.yaml` (spec.md §6.4), loaded with `serde_yaml` and
//! `Default` fallbacks — the same "fixed, validated struct" shape as
//! `oj-daemon`'s own `Config`, retargeted from a single user-level state
//! directory to one `.coven/` per workspace, since Coven is per-project.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config.yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Recognized `.coven/config.yaml` options (spec.md §6.4). Every field has a
/// default, so an absent or partially-filled file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonOptions {
    pub poll_interval: u64,
    pub max_concurrent_agents: usize,
    pub agent_command: Vec<String>,
    pub default_branch: String,
    pub default_grimoire: String,
    pub agent_timeout_default: u64,
    pub script_timeout_default: u64,
    pub workflow_timeout_default: u64,
    pub stale_claim_timeout: u64,
    pub soft_delete_retention: u64,
    pub workflow_state_retention: u64,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            poll_interval: 1,
            max_concurrent_agents: coven_engine::DEFAULT_MAX_CONCURRENT_AGENTS,
            agent_command: vec!["claude".to_string(), "--print".to_string()],
            default_branch: "main".to_string(),
            default_grimoire: "implement-with-tests".to_string(),
            agent_timeout_default: 15 * 60,
            script_timeout_default: 5 * 60,
            workflow_timeout_default: 2 * 60 * 60,
            stale_claim_timeout: coven_engine::DEFAULT_STALE_CLAIM_TIMEOUT.as_secs(),
            soft_delete_retention: coven_engine::DEFAULT_SOFT_DELETE_RETENTION.as_secs(),
            workflow_state_retention: 7 * 24 * 60 * 60,
        }
    }
}

impl DaemonOptions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn agent_timeout_default(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_default)
    }

    pub fn script_timeout_default(&self) -> Duration {
        Duration::from_secs(self.script_timeout_default)
    }

    pub fn workflow_timeout_default(&self) -> Duration {
        Duration::from_secs(self.workflow_timeout_default)
    }

    pub fn stale_claim_timeout(&self) -> Duration {
        Duration::from_secs(self.stale_claim_timeout)
    }

    pub fn soft_delete_retention(&self) -> Duration {
        Duration::from_secs(self.soft_delete_retention)
    }

    pub fn workflow_state_retention(&self) -> Duration {
        Duration::from_secs(self.workflow_state_retention)
    }
}

/// All paths and options for one workspace's daemon, rooted at
/// `<workspace>/.coven/` (spec.md §6.1).
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: PathBuf,
    pub coven_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub config_path: PathBuf,
    pub grimoires_dir: PathBuf,
    pub spells_dir: PathBuf,
    pub matcher_path: PathBuf,
    pub worktrees_dir: PathBuf,
    pub workflow_logs_dir: PathBuf,
    pub workflow_state_dir: PathBuf,
    pub wal_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub options: DaemonOptions,
}

impl Config {
    /// Loads configuration for the daemon serving `workspace`. `.coven/` and
    /// its subdirectories are not created here — that is `lifecycle::startup`'s
    /// job, once the single-instance lock is held.
    pub fn load(workspace: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let workspace = workspace.into();
        let coven_dir = workspace.join(".coven");
        let config_path = coven_dir.join("config.yaml");

        let options = if config_path.is_file() {
            let text = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
                path: config_path.clone(),
                source: e,
            })?;
            serde_yaml::from_str(&text)?
        } else {
            DaemonOptions::default()
        };

        Ok(Self {
            socket_path: coven_dir.join("covend.sock"),
            lock_path: coven_dir.join("covend.pid"),
            log_path: coven_dir.join("covend.log"),
            grimoires_dir: coven_dir.join("grimoires"),
            spells_dir: coven_dir.join("spells"),
            matcher_path: coven_dir.join("grimoire-matchers.yaml"),
            worktrees_dir: coven_dir.join("worktrees"),
            workflow_logs_dir: coven_dir.join("logs").join("workflows"),
            workflow_state_dir: coven_dir.join("state").join("workflows"),
            wal_path: coven_dir.join("wal").join("events.wal"),
            snapshot_path: coven_dir.join("snapshot.bin"),
            config_path,
            coven_dir,
            workspace,
            options,
        })
    }

    pub fn workspace_name(&self) -> String {
        self.workspace
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.workspace.display().to_string())
    }
}

pub fn ensure_dirs(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.coven_dir)?;
    std::fs::create_dir_all(&config.grimoires_dir)?;
    std::fs::create_dir_all(&config.spells_dir)?;
    std::fs::create_dir_all(&config.worktrees_dir)?;
    std::fs::create_dir_all(&config.workflow_logs_dir)?;
    std::fs::create_dir_all(&config.workflow_state_dir)?;
    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn workspace_root_from(path: &Path) -> PathBuf {
    path.to_path_buf()
}
