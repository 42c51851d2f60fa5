// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gf_core::test_support::issue;
use gf_core::{Event, ModelTier, TrackerStatus};
use std::path::{Path, PathBuf};

fn state(slots: u32) -> EngineState {
    let mut state = EngineState::default();
    state.ensure_slots(slots, Path::new("/repo"));
    state
}

fn add_issue(state: &mut EngineState, id: &str, priority: u32, created_at_ms: u64) {
    let mut i = issue(id);
    i.priority = priority;
    i.created_at_ms = created_at_ms;
    state.apply_event(&Event::IssueDiscovered { issue: i, at_ms: created_at_ms });
}

fn ids(picks: &[(SlotId, IssueId)]) -> Vec<(u32, String)> {
    picks.iter().map(|(s, i)| (s.0, i.as_str().to_string())).collect()
}

#[test]
fn pairs_idle_slots_ascending_with_priority_order() {
    let mut state = state(2);
    add_issue(&mut state, "X-2", 2, 10);
    add_issue(&mut state, "X-1", 1, 10);
    add_issue(&mut state, "X-3", 3, 10);

    let picks = pick_dispatches(&state, 100, false);
    assert_eq!(ids(&picks), vec![(0, "X-1".to_string()), (1, "X-2".to_string())]);
}

#[test]
fn priority_ties_break_by_created_at_then_id() {
    let mut state = state(3);
    add_issue(&mut state, "X-b", 1, 20);
    add_issue(&mut state, "X-a", 1, 20);
    add_issue(&mut state, "X-c", 1, 10);

    let ready = ready_issues(&state, 100, false);
    let names: Vec<&str> = ready.iter().map(|i| i.as_str()).collect();
    assert_eq!(names, vec!["X-c", "X-a", "X-b"]);
}

#[test]
fn busy_slots_are_skipped() {
    let mut state = state(2);
    add_issue(&mut state, "X-1", 1, 10);
    add_issue(&mut state, "X-2", 2, 10);
    state.apply_event(&Event::AttemptStarted {
        id: "X-1".into(),
        slot: SlotId(0),
        seq: 1,
        tier: ModelTier::Default,
        workspace: PathBuf::from("/repo/.worker-0"),
        at_ms: 11,
    });

    let picks = pick_dispatches(&state, 100, false);
    assert_eq!(ids(&picks), vec![(1, "X-2".to_string())]);
}

#[test]
fn dependency_gate_holds_until_blocker_completes() {
    let mut state = state(1);
    add_issue(&mut state, "X-1", 1, 10);
    add_issue(&mut state, "X-2", 0, 10);
    if let Some(record) = state.issues.get_mut("X-2") {
        record.issue.deps.push("X-1".into());
    }

    // X-2 has top priority but its blocker is open.
    let ready = ready_issues(&state, 100, false);
    assert_eq!(ready.first().map(|i| i.as_str()), Some("X-1"));
    assert_eq!(ready.len(), 1);

    state.apply_event(&Event::IssueCompleted { id: "X-1".into(), at_ms: 20 });
    let ready = ready_issues(&state, 100, false);
    assert_eq!(ready.first().map(|i| i.as_str()), Some("X-2"));
}

#[test]
fn backoff_gate_defers_until_deadline() {
    let mut state = state(1);
    add_issue(&mut state, "X-1", 1, 10);
    state.apply_event(&Event::IssueRequeued { id: "X-1".into(), retry_at_ms: Some(500) });

    assert!(ready_issues(&state, 499, false).is_empty());
    assert_eq!(ready_issues(&state, 500, false).len(), 1);
}

#[test]
fn closed_or_terminal_issues_are_not_ready() {
    let mut state = state(2);
    add_issue(&mut state, "X-1", 1, 10);
    add_issue(&mut state, "X-2", 1, 10);
    add_issue(&mut state, "X-3", 1, 10);
    if let Some(record) = state.issues.get_mut("X-1") {
        record.issue.status = TrackerStatus::Closed;
    }
    state.apply_event(&Event::IssueBlocked { id: "X-2".into(), reason: "m".into(), at_ms: 11 });

    let ready = ready_issues(&state, 100, false);
    assert_eq!(ready.iter().map(|i| i.as_str()).collect::<Vec<_>>(), vec!["X-3"]);
}

#[test]
fn no_ready_issues_means_no_dispatches() {
    let state = state(4);
    assert!(pick_dispatches(&state, 100, false).is_empty());
}

#[test]
fn single_worker_serializes_everything() {
    let mut state = state(1);
    for id in ["X-1", "X-2", "X-3"] {
        add_issue(&mut state, id, 1, 10);
    }
    assert_eq!(pick_dispatches(&state, 100, false).len(), 1);
}

#[test]
fn skip_deps_overrides_the_dependency_gate() {
    let mut state = state(1);
    add_issue(&mut state, "X-1", 1, 10);
    add_issue(&mut state, "X-2", 0, 10);
    if let Some(record) = state.issues.get_mut("X-2") {
        record.issue.deps.push("X-1".into());
    }

    assert_eq!(ready_issues(&state, 100, false).len(), 1);
    assert_eq!(ready_issues(&state, 100, true).len(), 2);
}
