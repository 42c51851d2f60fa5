// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-owned issue lifecycle state.

use crate::issue::{Issue, IssueId};
use crate::slot::SlotId;
use crate::transcript::SessionId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine lifecycle phase of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Assigned,
    Implementing,
    Reviewing,
    Merging,
    Completed,
    Failed,
    Blocked,
}

impl Phase {
    /// Phases in which the issue holds a slot assignment.
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Assigned | Phase::Implementing | Phase::Reviewing | Phase::Merging)
    }

    /// `completed` is terminal except via explicit user reopen; `blocked`
    /// and `failed` are recoverable only by control command.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed | Phase::Blocked)
    }
}

crate::simple_display! {
    Phase {
        Pending => "pending",
        Assigned => "assigned",
        Implementing => "implementing",
        Reviewing => "reviewing",
        Merging => "merging",
        Completed => "completed",
        Failed => "failed",
        Blocked => "blocked",
    }
}

/// Model tier used by an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    #[default]
    Default,
    Escalated,
}

crate::simple_display! {
    ModelTier {
        Default => "default",
        Escalated => "escalated",
    }
}

/// Outcome of a finished attempt, or the failure kind attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    TransientFailure,
    TestFailure,
    ReviewRejected,
    ManifestViolation,
    Timeout,
    MergeConflict,
    Crash,
    UserInterrupt,
    WorkspaceCreationFailed,
}

impl Outcome {
    /// Whether this outcome counts against the issue's attempt budget.
    ///
    /// Transient failures and user interrupts do not consume the budget;
    /// all others do.
    pub fn consumes_budget(&self) -> bool {
        !matches!(self, Outcome::TransientFailure | Outcome::UserInterrupt)
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Outcome::Success)
    }
}

crate::simple_display! {
    Outcome {
        Success => "success",
        TransientFailure => "transient_failure",
        TestFailure => "test_failure",
        ReviewRejected => "review_rejected",
        ManifestViolation => "manifest_violation",
        Timeout => "timeout",
        MergeConflict => "merge_conflict",
        Crash => "crash",
        UserInterrupt => "user_interrupt",
        WorkspaceCreationFailed => "workspace_creation_failed",
    }
}

/// One pass through the implement-review-merge pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based, strictly increasing and contiguous within an issue.
    pub seq: u32,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    #[serde(default)]
    pub tier: ModelTier,
    /// None while the attempt is live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Reviewer feedback, test output, or violation detail carried into
    /// the next attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Transcript session for this attempt.
    pub session: SessionId,
}

impl Attempt {
    pub fn is_live(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Engine-owned record augmenting the tracker mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue: Issue,
    pub phase: Phase,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_slot: Option<SlotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_kind: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<PathBuf>,
    /// Backoff gate: the scheduler skips this issue until the deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at_ms: Option<u64>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl IssueRecord {
    /// Create a fresh record for a newly mirrored issue.
    pub fn new(issue: Issue, now_ms: u64) -> Self {
        Self {
            issue,
            phase: Phase::Pending,
            attempts: Vec::new(),
            assigned_slot: None,
            last_error_kind: None,
            workspace_path: None,
            next_retry_at_ms: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn id(&self) -> &IssueId {
        &self.issue.id
    }

    /// The next attempt sequence number.
    pub fn next_seq(&self) -> u32 {
        self.attempts.last().map(|a| a.seq + 1).unwrap_or(1)
    }

    /// The currently live attempt, if any.
    pub fn live_attempt(&self) -> Option<&Attempt> {
        self.attempts.last().filter(|a| a.is_live())
    }

    /// Number of finished attempts that consumed the budget.
    pub fn budgeted_attempts(&self) -> u32 {
        self.attempts
            .iter()
            .filter(|a| a.outcome.is_some_and(|o| o.consumes_budget()))
            .count() as u32
    }

    /// Finished attempts with the given outcome.
    pub fn outcome_count(&self, outcome: Outcome) -> u32 {
        self.attempts.iter().filter(|a| a.outcome == Some(outcome)).count() as u32
    }

    /// Length of the trailing run of budget-consuming failures.
    ///
    /// Transient failures and interrupts are skipped (they neither extend
    /// nor break the streak); a success resets it.
    pub fn consecutive_budgeted_failures(&self) -> u32 {
        let mut streak = 0;
        for attempt in self.attempts.iter().rev() {
            match attempt.outcome {
                None => continue,
                Some(o) if !o.consumes_budget() => continue,
                Some(Outcome::Success) => break,
                Some(_) => streak += 1,
            }
        }
        streak
    }

    /// Length of the trailing run of transient failures.
    pub fn transient_streak(&self) -> u32 {
        let mut streak = 0;
        for attempt in self.attempts.iter().rev() {
            match attempt.outcome {
                None => continue,
                Some(Outcome::TransientFailure) => streak += 1,
                Some(Outcome::UserInterrupt) => continue,
                Some(_) => break,
            }
        }
        streak
    }

    /// Whether every declared blocker is satisfied.
    ///
    /// A dependency is satisfied once its engine record is `completed`; a
    /// dependency with no engine record counts as satisfied only when the
    /// lookup reports it closed in the tracker.
    pub fn deps_satisfied(&self, dep_done: impl Fn(&IssueId) -> bool) -> bool {
        self.issue.deps.iter().all(dep_done)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
