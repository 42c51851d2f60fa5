// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test fixtures shared across crates (behind the `test-support` feature).

use crate::issue::{Issue, IssueId, TrackerStatus};
use crate::record::{Attempt, IssueRecord, ModelTier, Outcome, Phase};
use crate::transcript::SessionId;

/// An open, dependency-free issue with the given id.
pub fn issue(id: &str) -> Issue {
    Issue {
        id: IssueId::from(id),
        title: format!("issue {id}"),
        description: String::new(),
        acceptance_criteria: String::new(),
        priority: 2,
        status: TrackerStatus::Open,
        deps: Vec::new(),
        created_at_ms: 1_000,
        updated_at_ms: 1_000,
        extra: serde_json::Map::new(),
    }
}

/// A finished (or live, when `outcome` is `None`) attempt.
pub fn attempt(issue_id: &str, seq: u32, outcome: Option<Outcome>) -> Attempt {
    Attempt {
        seq,
        started_at_ms: 1_000 + seq as u64,
        finished_at_ms: outcome.map(|_| 2_000 + seq as u64),
        tier: ModelTier::Default,
        outcome,
        feedback: None,
        session: SessionId::new(&IssueId::from(issue_id), seq),
    }
}

/// A pending record for a fresh issue.
pub fn record(id: &str) -> IssueRecord {
    IssueRecord::new(issue(id), 1_000)
}

/// A record with a finished attempt history.
pub fn record_with_outcomes(id: &str, outcomes: &[Outcome]) -> IssueRecord {
    let mut r = record(id);
    for (i, o) in outcomes.iter().enumerate() {
        r.attempts.push(attempt(id, i as u32 + 1, Some(*o)));
    }
    if let Some(last) = outcomes.last() {
        if last.is_failure() {
            r.last_error_kind = Some(*last);
        }
    }
    r.phase = Phase::Pending;
    r
}
