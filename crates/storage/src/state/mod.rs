// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

mod control;
mod issues;
mod slots;

use gf_core::{CommandId, Counters, Event, IssueId, IssueRecord, Phase, SlotId, WorkerSlot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;

/// Bound on the control-command audit history.
pub const COMMAND_HISTORY_LIMIT: usize = 100;

/// A held resource lock (currently only the mainline merge lock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub holder: SlotId,
    pub acquired_at_ms: u64,
}

/// Audit record of an accepted control command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: CommandId,
    pub op: String,
    pub at_ms: u64,
}

/// Materialized engine state built from WAL replay.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub issues: HashMap<IssueId, IssueRecord>,
    pub slots: BTreeMap<u32, WorkerSlot>,
    #[serde(default)]
    pub locks: HashMap<String, Lock>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub halted: Option<String>,
    #[serde(default)]
    pub command_history: VecDeque<CommandRecord>,
}

impl EngineState {
    /// Reconcile the slot table against the configured worker count.
    ///
    /// Missing slots are created idle; slots beyond the count are dropped
    /// (their workspaces are reaped separately as orphans).
    pub fn ensure_slots(&mut self, num_workers: u32, repo_root: &Path) {
        for index in 0..num_workers {
            self.slots
                .entry(index)
                .or_insert_with(|| WorkerSlot::new(SlotId(index), repo_root));
        }
        self.slots.retain(|index, _| *index < num_workers);
    }

    pub fn slot(&self, id: SlotId) -> Option<&WorkerSlot> {
        self.slots.get(&id.0)
    }

    /// Issue counts keyed by phase name.
    pub fn phase_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.issues.values() {
            *counts.entry(record.phase.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of issues currently holding a slot.
    pub fn active_issues(&self) -> usize {
        self.issues.values().filter(|r| r.phase.is_active()).count()
    }

    /// Whether a dependency is satisfied: completed in the engine, or
    /// closed tracker-side without an active engine record.
    pub fn dep_done(&self, id: &IssueId) -> bool {
        match self.issues.get(id) {
            Some(record) => {
                record.phase == Phase::Completed
                    || record.issue.status == gf_core::TrackerStatus::Closed
            }
            None => false,
        }
    }

    /// Apply an event to derive state changes.
    ///
    /// # Idempotency Requirement
    ///
    /// **All event handlers MUST be idempotent.** Applying the same event
    /// twice must produce the same state as applying it once: events may be
    /// re-applied when a snapshot and the WAL overlap after recovery.
    ///
    /// Guidelines:
    /// - Use assignment (`=`) instead of mutation (`+=`, `-=`)
    /// - Guard inserts with existence checks
    /// - Guard counter increments with state-transition checks
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            // Tracker mirror and issue lifecycle
            Event::IssueDiscovered { .. }
            | Event::IssueMirrored { .. }
            | Event::IssueRemoved { .. }
            | Event::AttemptStarted { .. }
            | Event::PhaseChanged { .. }
            | Event::AttemptFinished { .. }
            | Event::IssueRequeued { .. }
            | Event::IssueCompleted { .. }
            | Event::IssueBlocked { .. }
            | Event::IssueFailed { .. }
            | Event::IssueReopened { .. } => issues::apply(self, event),

            // Slots and locks
            Event::SlotReleased { .. }
            | Event::LockAcquired { .. }
            | Event::LockReleased { .. } => slots::apply(self, event),

            // Control plane, passes, counters
            Event::Paused
            | Event::Resumed
            | Event::CommandRecorded { .. }
            | Event::PassStarted { .. }
            | Event::PassFinished { .. }
            | Event::Checkpoint { .. }
            | Event::Halted { .. } => control::apply(self, event),

            // Forward-compatibility catch-all
            Event::Unknown => {}
        }
    }
}

#[cfg(test)]
#[path = "../state_tests/mod.rs"]
mod tests;
