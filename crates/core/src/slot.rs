// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker slot state.

use crate::issue::IssueId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Resource name of the synthetic mainline merge lock.
pub const MAIN_MERGE_LOCK: &str = "main";

/// Fixed worker slot index in `[0, num_workers)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl SlotId {
    pub fn index(&self) -> u32 {
        self.0
    }

    /// Deterministic workspace path for this slot: `<repo>/.worker-<k>/`.
    pub fn workspace_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(format!(".worker-{}", self.0))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    Idle,
    Busy,
    Draining,
}

crate::simple_display! {
    SlotState {
        Idle => "idle",
        Busy => "busy",
        Draining => "draining",
    }
}

/// A worker slot. Slots are created from config at startup and persist
/// across engine restarts; state is re-derived on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSlot {
    pub id: SlotId,
    #[serde(default)]
    pub state: SlotState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_issue: Option<IssueId>,
    pub workspace_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
}

impl WorkerSlot {
    pub fn new(id: SlotId, repo_root: &Path) -> Self {
        Self {
            id,
            state: SlotState::Idle,
            current_issue: None,
            workspace_path: id.workspace_path(repo_root),
            started_at_ms: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == SlotState::Idle
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
