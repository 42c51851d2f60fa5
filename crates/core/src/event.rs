// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events that drive state transitions in the engine.
//!
//! Events are facts about what happened; durable state is derived from
//! them by WAL replay. Serializes with `{"type": "topic:verb", ...fields}`.
//! Unknown type tags deserialize to `Unknown`.

use crate::counters::Counters;
use crate::id::CommandId;
use crate::issue::{Issue, IssueId};
use crate::record::{ModelTier, Outcome, Phase};
use crate::slot::SlotId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a periodic meta-pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Planner,
    Quality,
}

crate::simple_display! {
    PassKind {
        Planner => "planner",
        Quality => "quality",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- tracker mirror --
    /// The tracker mirror revealed an issue the engine has no record for.
    #[serde(rename = "issue:discovered")]
    IssueDiscovered { issue: Issue, at_ms: u64 },

    /// The tracker mirror changed for an issue the engine already tracks.
    #[serde(rename = "issue:mirrored")]
    IssueMirrored { issue: Issue, at_ms: u64 },

    /// The tracker deleted an issue; the engine record goes with it.
    #[serde(rename = "issue:removed")]
    IssueRemoved { id: IssueId },

    // -- lifecycle --
    /// The scheduler committed to a dispatch: a new attempt exists and the
    /// slot is reserved.
    #[serde(rename = "attempt:started")]
    AttemptStarted {
        id: IssueId,
        slot: SlotId,
        seq: u32,
        tier: ModelTier,
        workspace: PathBuf,
        at_ms: u64,
    },

    /// Pipeline progress within an attempt.
    #[serde(rename = "issue:phase")]
    PhaseChanged { id: IssueId, phase: Phase },

    /// The pipeline exited for this attempt.
    #[serde(rename = "attempt:finished")]
    AttemptFinished {
        id: IssueId,
        seq: u32,
        outcome: Outcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
        at_ms: u64,
    },

    /// Issue returned to the ready pool, optionally gated by a backoff
    /// deadline.
    #[serde(rename = "issue:requeued")]
    IssueRequeued {
        id: IssueId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_at_ms: Option<u64>,
    },

    #[serde(rename = "issue:completed")]
    IssueCompleted { id: IssueId, at_ms: u64 },

    #[serde(rename = "issue:blocked")]
    IssueBlocked { id: IssueId, reason: String, at_ms: u64 },

    /// Unrecoverable per-issue failure (e.g. workspace creation).
    #[serde(rename = "issue:failed")]
    IssueFailed { id: IssueId, kind: Outcome, at_ms: u64 },

    /// Explicit user reopen of a terminal issue.
    #[serde(rename = "issue:reopened")]
    IssueReopened { id: IssueId, at_ms: u64 },

    #[serde(rename = "slot:released")]
    SlotReleased { slot: SlotId },

    // -- merge lock --
    #[serde(rename = "lock:acquired")]
    LockAcquired { name: String, slot: SlotId, at_ms: u64 },

    #[serde(rename = "lock:released")]
    LockReleased { name: String },

    // -- control plane --
    #[serde(rename = "control:paused")]
    Paused,

    #[serde(rename = "control:resumed")]
    Resumed,

    /// Audit record of an accepted control command (bounded history).
    #[serde(rename = "control:command")]
    CommandRecorded { id: CommandId, op: String, at_ms: u64 },

    // -- meta passes --
    #[serde(rename = "pass:started")]
    PassStarted { kind: PassKind, iteration: u64, batch: u64, at_ms: u64 },

    #[serde(rename = "pass:finished")]
    PassFinished { kind: PassKind, batch: u64, proposals: u32, at_ms: u64 },

    // -- engine --
    /// Periodic counter checkpoint so iteration totals survive a crash.
    #[serde(rename = "engine:checkpoint")]
    Checkpoint { counters: Counters },

    /// The engine could not maintain its invariants and stopped.
    #[serde(rename = "engine:halted")]
    Halted { reason: String, at_ms: u64 },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Unknown,
}

impl Event {
    /// One-line summary for logs.
    pub fn log_summary(&self) -> String {
        match self {
            Event::IssueDiscovered { issue, .. } => format!("discovered {}", issue.id),
            Event::IssueMirrored { issue, .. } => format!("mirrored {}", issue.id),
            Event::IssueRemoved { id } => format!("removed {id}"),
            Event::AttemptStarted { id, slot, seq, tier, .. } => {
                format!("{id} attempt {seq} on {slot} ({tier})")
            }
            Event::PhaseChanged { id, phase } => format!("{id} -> {phase}"),
            Event::AttemptFinished { id, seq, outcome, .. } => {
                format!("{id} attempt {seq}: {outcome}")
            }
            Event::IssueRequeued { id, .. } => format!("{id} requeued"),
            Event::IssueCompleted { id, .. } => format!("{id} completed"),
            Event::IssueBlocked { id, reason, .. } => format!("{id} blocked: {reason}"),
            Event::IssueFailed { id, kind, .. } => format!("{id} failed: {kind}"),
            Event::IssueReopened { id, .. } => format!("{id} reopened"),
            Event::SlotReleased { slot } => format!("{slot} released"),
            Event::LockAcquired { name, slot, .. } => format!("lock {name} -> {slot}"),
            Event::LockReleased { name } => format!("lock {name} released"),
            Event::Paused => "paused".to_string(),
            Event::Resumed => "resumed".to_string(),
            Event::CommandRecorded { op, .. } => format!("command {op}"),
            Event::PassStarted { kind, batch, .. } => format!("{kind} pass {batch} started"),
            Event::PassFinished { kind, batch, proposals, .. } => {
                format!("{kind} pass {batch}: {proposals} proposals")
            }
            Event::Checkpoint { counters } => {
                format!("checkpoint iter={}", counters.total_iterations)
            }
            Event::Halted { reason, .. } => format!("halted: {reason}"),
            Event::Unknown => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
