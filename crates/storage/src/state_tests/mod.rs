// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for `EngineState::apply_event` idempotency and derivations.

use super::*;
use gf_core::test_support::issue;
use gf_core::{CommandId, Event, ModelTier, Outcome, Phase, SlotId, SlotState, TrackerStatus};
use std::path::PathBuf;

fn state_with_slots(n: u32) -> EngineState {
    let mut state = EngineState::default();
    state.ensure_slots(n, Path::new("/repo"));
    state
}

fn discovered(state: &mut EngineState, id: &str) {
    state.apply_event(&Event::IssueDiscovered { issue: issue(id), at_ms: 10 });
}

fn started(state: &mut EngineState, id: &str, slot: u32, seq: u32) {
    state.apply_event(&Event::AttemptStarted {
        id: id.into(),
        slot: SlotId(slot),
        seq,
        tier: ModelTier::Default,
        workspace: PathBuf::from(format!("/repo/.worker-{slot}")),
        at_ms: 20,
    });
}

fn finished(state: &mut EngineState, id: &str, seq: u32, outcome: Outcome) {
    state.apply_event(&Event::AttemptFinished {
        id: id.into(),
        seq,
        outcome,
        feedback: None,
        at_ms: 30,
    });
}

// =============================================================================
// Discovery and mirroring
// =============================================================================

#[test]
fn discovery_creates_a_pending_record_once() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    discovered(&mut state, "X-1");

    assert_eq!(state.issues.len(), 1);
    let record = &state.issues["X-1"];
    assert_eq!(record.phase, Phase::Pending);
    assert!(record.attempts.is_empty());
}

#[test]
fn mirrored_refreshes_the_tracker_view_without_touching_lifecycle() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 0, 1);

    let mut updated = issue("X-1");
    updated.title = "new title".into();
    updated.priority = 0;
    state.apply_event(&Event::IssueMirrored { issue: updated, at_ms: 40 });

    let record = &state.issues["X-1"];
    assert_eq!(record.issue.title, "new title");
    assert_eq!(record.phase, Phase::Assigned);
    assert_eq!(record.attempts.len(), 1);
}

#[test]
fn removed_issue_frees_its_slot() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 0, 1);

    state.apply_event(&Event::IssueRemoved { id: "X-1".into() });

    assert!(state.issues.is_empty());
    let slot = state.slot(SlotId(0)).unwrap();
    assert_eq!(slot.state, SlotState::Idle);
    assert!(slot.current_issue.is_none());
}

// =============================================================================
// Attempts
// =============================================================================

#[test]
fn attempt_started_reserves_the_slot_and_is_idempotent() {
    let mut state = state_with_slots(2);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 1, 1);
    started(&mut state, "X-1", 1, 1);

    let record = &state.issues["X-1"];
    assert_eq!(record.attempts.len(), 1);
    assert_eq!(record.phase, Phase::Assigned);
    assert_eq!(record.assigned_slot, Some(SlotId(1)));
    assert_eq!(record.attempts[0].session.as_str(), "X-1/1");

    let slot = state.slot(SlotId(1)).unwrap();
    assert_eq!(slot.state, SlotState::Busy);
    assert_eq!(slot.current_issue.as_ref().map(|i| i.as_str()), Some("X-1"));
}

#[test]
fn attempt_finished_finalizes_once_and_counts_failures_once() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 0, 1);

    finished(&mut state, "X-1", 1, Outcome::TestFailure);
    finished(&mut state, "X-1", 1, Outcome::TestFailure);

    let record = &state.issues["X-1"];
    assert_eq!(record.attempts[0].outcome, Some(Outcome::TestFailure));
    assert_eq!(record.last_error_kind, Some(Outcome::TestFailure));
    assert_eq!(state.counters.failed_attempts, 1);
}

#[test]
fn non_budgeted_outcomes_do_not_count_as_failed_attempts() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 0, 1);
    finished(&mut state, "X-1", 1, Outcome::UserInterrupt);

    assert_eq!(state.counters.failed_attempts, 0);
    assert_eq!(state.issues["X-1"].last_error_kind, Some(Outcome::UserInterrupt));
}

// =============================================================================
// Terminal transitions
// =============================================================================

#[test]
fn completion_increments_counter_exactly_once() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 0, 1);
    finished(&mut state, "X-1", 1, Outcome::Success);

    state.apply_event(&Event::IssueCompleted { id: "X-1".into(), at_ms: 50 });
    state.apply_event(&Event::IssueCompleted { id: "X-1".into(), at_ms: 50 });

    assert_eq!(state.counters.successful_completions, 1);
    let record = &state.issues["X-1"];
    assert_eq!(record.phase, Phase::Completed);
    assert_eq!(record.issue.status, TrackerStatus::Closed);
    assert!(record.assigned_slot.is_none());
}

#[test]
fn requeue_returns_to_pending_with_backoff_gate() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 0, 1);
    finished(&mut state, "X-1", 1, Outcome::TransientFailure);

    state.apply_event(&Event::IssueRequeued { id: "X-1".into(), retry_at_ms: Some(99) });

    let record = &state.issues["X-1"];
    assert_eq!(record.phase, Phase::Pending);
    assert_eq!(record.next_retry_at_ms, Some(99));
    assert!(record.assigned_slot.is_none());
}

#[test]
fn reopen_only_applies_to_terminal_issues() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    state.apply_event(&Event::IssueBlocked { id: "X-1".into(), reason: "stuck".into(), at_ms: 9 });
    assert_eq!(state.issues["X-1"].phase, Phase::Blocked);

    state.apply_event(&Event::IssueReopened { id: "X-1".into(), at_ms: 10 });
    assert_eq!(state.issues["X-1"].phase, Phase::Pending);

    // Reopening a pending issue is a no-op.
    started(&mut state, "X-1", 0, 1);
    state.apply_event(&Event::IssueReopened { id: "X-1".into(), at_ms: 11 });
    assert_eq!(state.issues["X-1"].phase, Phase::Assigned);
}

// =============================================================================
// Slots, locks, control plane
// =============================================================================

#[test]
fn slot_release_clears_assignment() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    started(&mut state, "X-1", 0, 1);

    state.apply_event(&Event::SlotReleased { slot: SlotId(0) });
    let slot = state.slot(SlotId(0)).unwrap();
    assert!(slot.is_idle());
    assert!(slot.started_at_ms.is_none());
}

#[test]
fn lock_lifecycle() {
    let mut state = state_with_slots(1);
    state.apply_event(&Event::LockAcquired { name: "main".into(), slot: SlotId(0), at_ms: 7 });
    assert_eq!(state.locks["main"].holder, SlotId(0));

    state.apply_event(&Event::LockReleased { name: "main".into() });
    assert!(state.locks.is_empty());
}

#[test]
fn pause_resume_round_trip() {
    let mut state = EngineState::default();
    state.apply_event(&Event::Paused);
    state.apply_event(&Event::Paused);
    assert!(state.paused);
    state.apply_event(&Event::Resumed);
    assert!(!state.paused);
}

#[test]
fn command_history_is_bounded_and_deduplicated() {
    let mut state = EngineState::default();
    for i in 0..150 {
        state.apply_event(&Event::CommandRecorded {
            id: CommandId::from(format!("cmd-{i}").as_str()),
            op: "pause".into(),
            at_ms: i,
        });
    }
    assert_eq!(state.command_history.len(), COMMAND_HISTORY_LIMIT);
    assert_eq!(state.command_history.front().unwrap().at_ms, 50);

    // Replaying an already recorded command changes nothing.
    let snapshot = state.clone();
    state.apply_event(&Event::CommandRecorded {
        id: CommandId::from("cmd-149"),
        op: "pause".into(),
        at_ms: 149,
    });
    assert_eq!(state, snapshot);
}

#[test]
fn checkpoint_merge_and_batch_tracking() {
    let mut state = EngineState::default();
    state.apply_event(&Event::PassStarted {
        kind: gf_core::PassKind::Planner,
        iteration: 50,
        batch: 3,
        at_ms: 0,
    });
    assert_eq!(state.counters.next_batch_id, 4);

    let counters = gf_core::Counters { total_iterations: 500, ..Default::default() };
    state.apply_event(&Event::Checkpoint { counters });
    assert_eq!(state.counters.total_iterations, 500);
    assert_eq!(state.counters.next_batch_id, 4);
}

#[test]
fn halted_is_sticky_until_restart() {
    let mut state = EngineState::default();
    state.apply_event(&Event::Halted { reason: "state store write failure".into(), at_ms: 1 });
    assert_eq!(state.halted.as_deref(), Some("state store write failure"));
}

// =============================================================================
// Derivations
// =============================================================================

#[test]
fn ensure_slots_reconciles_both_directions() {
    let mut state = EngineState::default();
    state.ensure_slots(3, Path::new("/repo"));
    assert_eq!(state.slots.len(), 3);

    state.ensure_slots(1, Path::new("/repo"));
    assert_eq!(state.slots.len(), 1);
    assert!(state.slot(SlotId(0)).is_some());
}

#[test]
fn dep_done_requires_completion_or_closed_mirror() {
    let mut state = state_with_slots(1);
    discovered(&mut state, "X-1");
    assert!(!state.dep_done(&"X-1".into()));
    assert!(!state.dep_done(&"X-404".into()));

    state.apply_event(&Event::IssueCompleted { id: "X-1".into(), at_ms: 1 });
    assert!(state.dep_done(&"X-1".into()));
}

#[test]
fn phase_counts_groups_records() {
    let mut state = state_with_slots(2);
    discovered(&mut state, "X-1");
    discovered(&mut state, "X-2");
    started(&mut state, "X-1", 0, 1);

    let counts = state.phase_counts();
    assert_eq!(counts.get("pending"), Some(&1));
    assert_eq!(counts.get("assigned"), Some(&1));
    assert_eq!(state.active_issues(), 1);
}
