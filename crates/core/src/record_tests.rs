// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{attempt, issue};
use yare::parameterized;

fn record_with(outcomes: &[Outcome]) -> IssueRecord {
    let mut record = IssueRecord::new(issue("X-1"), 0);
    for (i, outcome) in outcomes.iter().enumerate() {
        record.attempts.push(attempt("X-1", i as u32 + 1, Some(*outcome)));
    }
    record
}

#[parameterized(
    success = { Outcome::Success, true },
    test_failure = { Outcome::TestFailure, true },
    review_rejected = { Outcome::ReviewRejected, true },
    merge_conflict = { Outcome::MergeConflict, true },
    crash = { Outcome::Crash, true },
    timeout = { Outcome::Timeout, true },
    manifest = { Outcome::ManifestViolation, true },
    workspace = { Outcome::WorkspaceCreationFailed, true },
    transient = { Outcome::TransientFailure, false },
    interrupt = { Outcome::UserInterrupt, false },
)]
fn budget_consumption(outcome: Outcome, consumes: bool) {
    assert_eq!(outcome.consumes_budget(), consumes);
}

#[test]
fn next_seq_is_contiguous_from_one() {
    let mut record = record_with(&[]);
    assert_eq!(record.next_seq(), 1);
    record.attempts.push(attempt("X-1", 1, Some(Outcome::TestFailure)));
    assert_eq!(record.next_seq(), 2);
}

#[test]
fn budgeted_attempts_skips_transient_and_interrupt() {
    let record = record_with(&[
        Outcome::TransientFailure,
        Outcome::TestFailure,
        Outcome::UserInterrupt,
        Outcome::ReviewRejected,
    ]);
    assert_eq!(record.budgeted_attempts(), 2);
}

#[test]
fn consecutive_failures_reset_on_success() {
    let record = record_with(&[Outcome::TestFailure, Outcome::Success, Outcome::Crash]);
    assert_eq!(record.consecutive_budgeted_failures(), 1);
}

#[test]
fn consecutive_failures_skip_transient() {
    let record = record_with(&[
        Outcome::TestFailure,
        Outcome::TransientFailure,
        Outcome::ReviewRejected,
    ]);
    assert_eq!(record.consecutive_budgeted_failures(), 2);
}

#[test]
fn transient_streak_counts_trailing_run() {
    let record = record_with(&[
        Outcome::TestFailure,
        Outcome::TransientFailure,
        Outcome::TransientFailure,
    ]);
    assert_eq!(record.transient_streak(), 2);

    let broken = record_with(&[Outcome::TransientFailure, Outcome::TestFailure]);
    assert_eq!(broken.transient_streak(), 0);
}

#[test]
fn live_attempt_is_last_unfinished() {
    let mut record = record_with(&[Outcome::TestFailure]);
    assert!(record.live_attempt().is_none());

    record.attempts.push(attempt("X-1", 2, None));
    assert_eq!(record.live_attempt().map(|a| a.seq), Some(2));
}

#[parameterized(
    pending = { Phase::Pending, false, false },
    assigned = { Phase::Assigned, true, false },
    implementing = { Phase::Implementing, true, false },
    reviewing = { Phase::Reviewing, true, false },
    merging = { Phase::Merging, true, false },
    completed = { Phase::Completed, false, true },
    failed = { Phase::Failed, false, true },
    blocked = { Phase::Blocked, false, true },
)]
fn phase_classification(phase: Phase, active: bool, terminal: bool) {
    assert_eq!(phase.is_active(), active);
    assert_eq!(phase.is_terminal(), terminal);
}

#[test]
fn deps_satisfied_consults_lookup() {
    let mut record = record_with(&[]);
    record.issue.deps = vec![IssueId::from("X-2"), IssueId::from("X-3")];

    assert!(!record.deps_satisfied(|id| id == &IssueId::from("X-2")));
    assert!(record.deps_satisfied(|_| true));
}
