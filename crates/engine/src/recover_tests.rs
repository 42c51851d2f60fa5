// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gf_adapters::{DiffSummary, FakeTracker, FakeVcs};
use gf_core::test_support::issue;
use gf_core::{FakeClock, ModelTier, SlotState, TrackerStatus};
use gf_storage::{StoreOptions, Wal};

struct Fixture {
    store: Store,
    vcs: FakeVcs,
    tracker: FakeTracker,
    clock: FakeClock,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(
        &dir.path().join("state"),
        StoreOptions { snapshot_interval: 0, reinitialize: false },
    )
    .unwrap();
    Fixture {
        store,
        vcs: FakeVcs::new(dir.path()),
        tracker: FakeTracker::new(),
        clock: FakeClock::new(),
        _dir: dir,
    }
}

/// Simulate a crash with an issue in flight on slot 0.
fn strand(f: &mut Fixture, id: &str, phase: Phase) {
    f.tracker.seed(issue(id));
    f.store
        .commit(Event::IssueDiscovered { issue: issue(id), at_ms: 1 })
        .unwrap();
    f.store.with_state_mut(|s| s.ensure_slots(1, Path::new("/repo")));
    f.store
        .commit(Event::AttemptStarted {
            id: id.into(),
            slot: SlotId(0),
            seq: 1,
            tier: ModelTier::Default,
            workspace: PathBuf::from("/repo/.worker-0"),
            at_ms: 2,
        })
        .unwrap();
    f.store.commit(Event::PhaseChanged { id: id.into(), phase }).unwrap();
    if phase == Phase::Merging {
        f.store
            .commit(Event::LockAcquired { name: "main".into(), slot: SlotId(0), at_ms: 3 })
            .unwrap();
    }
}

async fn run(f: &mut Fixture) -> RecoveryReport {
    let clock = f.clock.clone();
    reconcile(&mut f.store, &f.vcs, &f.tracker, &clock, 1, Path::new("/repo"))
        .await
        .unwrap()
}

#[tokio::test]
async fn implementing_issue_is_requeued_without_budget() {
    let mut f = fixture();
    strand(&mut f, "X-1", Phase::Implementing);

    let report = run(&mut f).await;
    assert_eq!(report.requeued, 1);

    f.store.with_state(|s| {
        let record = &s.issues["X-1"];
        assert_eq!(record.phase, Phase::Pending);
        assert_eq!(record.attempts[0].outcome, Some(Outcome::UserInterrupt));
        assert_eq!(record.budgeted_attempts(), 0);
        assert!(record.assigned_slot.is_none());
        assert_eq!(s.slot(SlotId(0)).unwrap().state, SlotState::Idle);
    });
}

#[tokio::test]
async fn merging_with_clean_workspace_completes_idempotently() {
    let mut f = fixture();
    strand(&mut f, "X-1", Phase::Merging);
    // Default FakeVcs diff is empty: the squash landed before the crash.

    let report = run(&mut f).await;
    assert_eq!(report.completed, 1);
    assert_eq!(report.requeued, 0);

    f.store.with_state(|s| {
        let record = &s.issues["X-1"];
        assert_eq!(record.phase, Phase::Completed);
        assert_eq!(record.attempts[0].outcome, Some(Outcome::Success));
        assert_eq!(s.counters.successful_completions, 1);
    });
    assert_eq!(f.tracker.status_of(&"X-1".into()), Some(TrackerStatus::Closed));
}

#[tokio::test]
async fn merging_with_remaining_diff_requeues_and_rebuilds() {
    let mut f = fixture();
    strand(&mut f, "X-1", Phase::Merging);
    let mut diff = DiffSummary::default();
    diff.modified.insert("src/lib.rs".into());
    f.vcs.push_diff(diff);

    let report = run(&mut f).await;
    assert_eq!(report.requeued, 1);

    f.store.with_state(|s| {
        assert_eq!(s.issues["X-1"].phase, Phase::Pending);
    });
    // The half-merged workspace was removed for a rebuild.
    let calls = f.vcs.calls.lock().join(";");
    assert!(calls.contains("remove:"), "calls: {calls}");
    assert_eq!(f.tracker.status_of(&"X-1".into()), Some(TrackerStatus::Open));
}

#[tokio::test]
async fn orphan_locks_are_released() {
    let mut f = fixture();
    strand(&mut f, "X-1", Phase::Merging);
    let mut diff = DiffSummary::default();
    diff.modified.insert("a".into());
    f.vcs.push_diff(diff);

    let report = run(&mut f).await;
    assert_eq!(report.locks_released, 1);
    f.store.with_state(|s| assert!(s.locks.is_empty()));
}

#[tokio::test]
async fn slot_table_follows_config() {
    let mut f = fixture();
    f.store.with_state_mut(|s| s.ensure_slots(4, Path::new("/repo")));

    run(&mut f).await;
    f.store.with_state(|s| assert_eq!(s.slots.len(), 1));
}

#[tokio::test]
async fn orphan_workspaces_are_reaped() {
    let mut f = fixture();
    // Slot 3 existed under an older, larger config.
    f.vcs.create_workspace(SlotId(3)).await.unwrap();

    let report = run(&mut f).await;
    assert_eq!(report.orphans_reaped, 1);
}

#[tokio::test]
async fn reconcile_of_a_clean_store_is_a_no_op() {
    let mut f = fixture();
    f.store.with_state_mut(|s| s.ensure_slots(1, Path::new("/repo")));
    let report = run(&mut f).await;
    assert_eq!(report, RecoveryReport::default());
}

#[tokio::test]
async fn recovery_does_not_duplicate_attempts_across_restarts() {
    let mut f = fixture();
    strand(&mut f, "X-1", Phase::Implementing);
    run(&mut f).await;
    // A second reconcile (double restart) changes nothing further.
    let report = run(&mut f).await;
    assert_eq!(report.requeued, 0);
    f.store.with_state(|s| assert_eq!(s.issues["X-1"].attempts.len(), 1));
    // And the WAL replays to the same state.
    let entries = Wal::entries_after(&f._dir.path().join("state/events.wal"), 0).unwrap();
    assert!(!entries.is_empty());
}
