// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin, typed wrapper over the external VCS binary.
//!
//! Workspace lifecycle, diff summary, squash-merge, conflict detection.
//! All mainline-touching operations serialize on an internal mutex;
//! operations on distinct workspaces run concurrently.

use crate::exec;
use async_trait::async_trait;
use gf_core::SlotId;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("vcs binary unreachable: {0}")]
    Unreachable(#[from] std::io::Error),
    #[error("workspace creation failed for {slot}: {detail}")]
    WorkspaceCreation { slot: SlotId, detail: String },
    #[error("vcs {op} failed: {detail}")]
    CommandFailed { op: &'static str, detail: String },
}

/// Disjoint file sets from a workspace summary diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub modified: BTreeSet<String>,
    pub added: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl DiffSummary {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    /// Union of all touched paths.
    pub fn files(&self) -> BTreeSet<String> {
        self.modified
            .iter()
            .chain(self.added.iter())
            .chain(self.deleted.iter())
            .cloned()
            .collect()
    }

    /// Touched paths not covered by the declared manifest.
    /// An empty manifest declares no restriction.
    pub fn outside_manifest(&self, manifest: &[String]) -> Vec<String> {
        if manifest.is_empty() {
            return Vec::new();
        }
        self.files()
            .into_iter()
            .filter(|f| !manifest.iter().any(|m| m == f))
            .collect()
    }

    /// Parse the VCS `diff --summary` output: one `<flag> <path>` per line.
    pub fn parse(text: &str) -> Self {
        let mut summary = DiffSummary::default();
        for line in text.lines() {
            let line = line.trim();
            let Some((flag, path)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let path = path.trim().to_string();
            match flag {
                "M" => {
                    summary.modified.insert(path);
                }
                "A" => {
                    summary.added.insert(path);
                }
                "D" => {
                    summary.deleted.insert(path);
                }
                _ => {}
            }
        }
        summary
    }
}

/// Result of a squash into the mainline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeResult {
    pub ok: bool,
    /// True when the tool reported textual conflict markers.
    pub conflict: bool,
}

#[async_trait]
pub trait VcsGateway: Send + Sync {
    /// Idempotent: an existing stale workspace is updated in place.
    async fn create_workspace(&self, slot: SlotId) -> Result<PathBuf, VcsError>;

    /// Best-effort; never fails the pipeline.
    async fn remove_workspace(&self, path: &Path);

    async fn diff_summary(&self, path: &Path) -> Result<DiffSummary, VcsError>;

    /// Returns false when the workspace had no changes to commit.
    async fn commit(&self, path: &Path, message: &str) -> Result<bool, VcsError>;

    /// Atomically fold the workspace's change into the mainline.
    async fn squash_into_main(&self, path: &Path) -> Result<MergeResult, VcsError>;

    /// Roll back the given paths in the workspace to their mainline state.
    async fn restore_paths(&self, path: &Path, paths: &[String]) -> Result<(), VcsError>;

    /// Workspace directories that belong to no configured slot.
    async fn list_orphan_workspaces(&self, num_slots: u32) -> Result<Vec<PathBuf>, VcsError>;
}

/// [`VcsGateway`] over an external binary with `workspace`, `diff`,
/// `commit`, `squash`, and `restore` subcommands.
pub struct ExternalVcs {
    bin: String,
    repo_root: PathBuf,
    /// Serializes squashes (and anything else touching the mainline).
    main_mutex: Mutex<()>,
}

impl ExternalVcs {
    pub fn new(bin: impl Into<String>, repo_root: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into(), repo_root: repo_root.into(), main_mutex: Mutex::new(()) }
    }

    async fn run(&self, args: &[&str], cwd: &Path) -> Result<exec::CmdOutput, VcsError> {
        Ok(exec::run(&self.bin, args, cwd).await?)
    }
}

#[async_trait]
impl VcsGateway for ExternalVcs {
    async fn create_workspace(&self, slot: SlotId) -> Result<PathBuf, VcsError> {
        let path = slot.workspace_path(&self.repo_root);
        let path_str = path.display().to_string();

        let _main = self.main_mutex.lock().await;
        let output = if path.is_dir() {
            // Exists: refresh against the current mainline head.
            self.run(&["workspace", "update", &path_str], &self.repo_root).await?
        } else {
            self.run(&["workspace", "add", &path_str], &self.repo_root).await?
        };

        if !output.success() {
            return Err(VcsError::WorkspaceCreation {
                slot,
                detail: output.stderr.trim().to_string(),
            });
        }
        debug!(slot = %slot, path = %path_str, "workspace ready");
        Ok(path)
    }

    async fn remove_workspace(&self, path: &Path) {
        let path_str = path.display().to_string();
        match self.run(&["workspace", "forget", &path_str], &self.repo_root).await {
            Ok(output) if !output.success() => {
                warn!(path = %path_str, stderr = %output.stderr.trim(), "workspace forget failed");
            }
            Err(e) => warn!(path = %path_str, error = %e, "workspace forget unreachable"),
            Ok(_) => {}
        }
        if let Err(e) = tokio::fs::remove_dir_all(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path_str, error = %e, "workspace directory removal failed");
            }
        }
    }

    async fn diff_summary(&self, path: &Path) -> Result<DiffSummary, VcsError> {
        let output = self.run(&["diff", "--summary"], path).await?;
        if !output.success() {
            return Err(VcsError::CommandFailed {
                op: "diff",
                detail: output.stderr.trim().to_string(),
            });
        }
        Ok(DiffSummary::parse(&output.stdout))
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<bool, VcsError> {
        let output = self.run(&["commit", "-m", message], path).await?;
        if output.success() {
            return Ok(true);
        }
        if output.mentions("no changes") || output.mentions("nothing to commit") {
            return Ok(false);
        }
        Err(VcsError::CommandFailed { op: "commit", detail: output.stderr.trim().to_string() })
    }

    async fn squash_into_main(&self, path: &Path) -> Result<MergeResult, VcsError> {
        let _main = self.main_mutex.lock().await;
        let output = self.run(&["squash", "--into", "main"], path).await?;
        if output.success() {
            return Ok(MergeResult { ok: true, conflict: false });
        }
        if output.mentions("conflict") {
            return Ok(MergeResult { ok: false, conflict: true });
        }
        Ok(MergeResult { ok: false, conflict: false })
    }

    async fn restore_paths(&self, path: &Path, paths: &[String]) -> Result<(), VcsError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["restore"];
        args.extend(paths.iter().map(String::as_str));
        let output = self.run(&args, path).await?;
        if !output.success() {
            return Err(VcsError::CommandFailed {
                op: "restore",
                detail: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn list_orphan_workspaces(&self, num_slots: u32) -> Result<Vec<PathBuf>, VcsError> {
        let mut orphans = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.repo_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(index) = name.strip_prefix(".worker-") else { continue };
            let Ok(index) = index.parse::<u32>() else { continue };
            if index >= num_slots && entry.path().is_dir() {
                orphans.push(entry.path());
            }
        }
        Ok(orphans)
    }
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
