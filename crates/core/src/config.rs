// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration (TOML).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    /// Repository root the workers operate on.
    pub repo_root: PathBuf,
    pub build_cmd: String,
    pub test_cmd: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "project".to_string(),
            repo_root: PathBuf::from("."),
            build_cmd: String::new(),
            test_cmd: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Implementer command line (shell-split).
    pub implementer: String,
    /// Reviewer command line (shell-split).
    pub reviewer: String,
    /// Wall timeout for one agent invocation.
    pub timeout_seconds: u64,
    /// Idle timeout: no output for this long kills the agent.
    pub idle_timeout_seconds: u64,
    /// SIGTERM-to-SIGKILL grace window.
    pub grace_seconds: u64,
    pub num_workers: u32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            implementer: "agent implement".to_string(),
            reviewer: "agent review".to_string(),
            timeout_seconds: 1800,
            idle_timeout_seconds: 300,
            grace_seconds: 5,
            num_workers: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassesConfig {
    pub planner_enabled: bool,
    /// Loop iterations between planner passes.
    pub planner_interval: u64,
    pub planner_agent: String,
    pub quality_enabled: bool,
    pub quality_interval: u64,
    pub quality_agent: String,
}

impl Default for PassesConfig {
    fn default() -> Self {
        Self {
            planner_enabled: true,
            planner_interval: 50,
            planner_agent: "agent plan".to_string(),
            quality_enabled: true,
            quality_interval: 200,
            quality_agent: "agent quality".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Tracker flavor; only `bd` is implemented.
    #[serde(rename = "type")]
    pub kind: String,
    /// Tracker CLI binary.
    pub bin: String,
    /// Append-only record log, relative to the repo root unless absolute.
    pub records_path: PathBuf,
    /// Whether `gaffer sync` pushes to a remote issue host (out of scope;
    /// kept for config compatibility).
    pub sync: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: "bd".to_string(),
            bin: "bd".to_string(),
            records_path: PathBuf::from(".tracker/records.ndjson"),
            sync: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    /// External VCS binary providing workspace/diff/commit/squash.
    pub bin: String,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self { bin: "jj".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub default_model: String,
    pub escalation_model: String,
    /// Consecutive budgeted failures before the stronger tier is used.
    pub escalate_after_attempts: u32,
    pub max_total_attempts: u32,
    /// Transient-failure backoff schedule.
    pub backoff_ms_initial: u64,
    pub backoff_factor: f64,
    /// Transient retries before the failure stops being treated as transient.
    pub max_transient_retries: u32,
    /// Review iterations before the issue is blocked.
    pub max_review_iterations: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_model: "standard".to_string(),
            escalation_model: "strong".to_string(),
            escalate_after_attempts: 2,
            max_total_attempts: 8,
            backoff_ms_initial: 2_000,
            backoff_factor: 2.0,
            max_transient_retries: 3,
            max_review_iterations: 5,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before transient retry number `retry` (1-based),
    /// capped at 60 s.
    pub fn backoff_ms(&self, retry: u32) -> u64 {
        let factor = self.backoff_factor.max(1.0).powi(retry.saturating_sub(1) as i32);
        ((self.backoff_ms_initial as f64) * factor).min(60_000.0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// State directory (WAL, snapshots, transcripts, socket, logs).
    /// Relative paths resolve against the repo root.
    pub state_dir: PathBuf,
    /// Dashboard port; 0 disables the dashboard.
    pub port: u16,
    /// Iterations between counter checkpoints.
    pub checkpoint_interval: u64,
    /// Iterations between automatic snapshots.
    pub snapshot_interval: u64,
    /// Grace window for interrupt to settle all slots, seconds.
    pub interrupt_grace_seconds: u64,
    /// Transcript retention in days; 0 keeps everything.
    pub transcript_retention_days: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".gaffer"),
            port: 0,
            checkpoint_interval: 50,
            snapshot_interval: 500,
            interrupt_grace_seconds: 30,
            transcript_retention_days: 30,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub agents: AgentsConfig,
    pub passes: PassesConfig,
    pub tracker: TrackerConfig,
    pub vcs: VcsConfig,
    pub retry: RetryConfig,
    pub daemon: DaemonConfig,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.num_workers == 0 {
            return Err(ConfigError::Invalid("agents.num_workers must be at least 1".into()));
        }
        if self.retry.max_total_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_total_attempts must be at least 1".into()));
        }
        if self.agents.implementer.trim().is_empty() || self.agents.reviewer.trim().is_empty() {
            return Err(ConfigError::Invalid("agents.implementer and agents.reviewer are required".into()));
        }
        if self.retry.backoff_factor < 1.0 {
            return Err(ConfigError::Invalid("retry.backoff_factor must be >= 1.0".into()));
        }
        Ok(())
    }

    /// State directory resolved against the repo root.
    pub fn state_dir(&self) -> PathBuf {
        if self.daemon.state_dir.is_absolute() {
            self.daemon.state_dir.clone()
        } else {
            self.project.repo_root.join(&self.daemon.state_dir)
        }
    }

    /// Tracker record log resolved against the repo root.
    pub fn tracker_records_path(&self) -> PathBuf {
        if self.tracker.records_path.is_absolute() {
            self.tracker.records_path.clone()
        } else {
            self.project.repo_root.join(&self.tracker.records_path)
        }
    }

    /// Control socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.state_dir().join("gafferd.sock")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
