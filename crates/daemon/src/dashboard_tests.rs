// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gf_core::test_support::issue;
use gf_core::{Event, TranscriptEventKind};
use gf_storage::{Store, StoreOptions};
use tempfile::TempDir;

fn state_with_store(dir: &TempDir) -> (DashboardState, Store) {
    let mut store = Store::open(
        &dir.path().join("state"),
        StoreOptions { snapshot_interval: 0, reinitialize: false },
    )
    .unwrap();
    store.with_state_mut(|s| s.ensure_slots(2, dir.path()));
    store.commit(Event::IssueDiscovered { issue: issue("X-1"), at_ms: 1 }).unwrap();
    store.commit(Event::IssueDiscovered { issue: issue("X-2"), at_ms: 2 }).unwrap();

    let state = DashboardState {
        reader: store.reader(),
        handle: None,
        bus: Arc::new(EventBus::new()),
        transcripts: TranscriptStore::new(&dir.path().join("state")),
    };
    (state, store)
}

#[tokio::test]
async fn issues_endpoint_projects_sorted_records() {
    let dir = TempDir::new().unwrap();
    let (state, _store) = state_with_store(&dir);

    let Json(issues) = get_issues(State(state)).await;
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].id, "X-1");
    assert_eq!(issues[0].phase, "pending");
}

#[tokio::test]
async fn workers_endpoint_projects_slot_table() {
    let dir = TempDir::new().unwrap();
    let (state, _store) = state_with_store(&dir);

    let Json(slots) = get_workers(State(state)).await;
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].state, "idle");
}

#[tokio::test]
async fn engineless_status_is_degraded() {
    let dir = TempDir::new().unwrap();
    let (state, _store) = state_with_store(&dir);

    let status = current_status(&state).await;
    assert!(status.degraded);
    assert_eq!(status.phases.get("pending"), Some(&2));
    assert!(status.state_version > 0);
}

#[tokio::test]
async fn session_endpoint_reads_latest_transcript() {
    let dir = TempDir::new().unwrap();
    let (state, _store) = state_with_store(&dir);

    let session = SessionId::new(&IssueId::from("X-1"), 2);
    let mut writer = state.transcripts.writer(&session).unwrap();
    writer
        .append(TranscriptEventKind::StdoutText, serde_json::json!("hello"), 1)
        .unwrap();

    let sessions = state.transcripts.sessions_for_issue(&IssueId::from("X-1"));
    assert_eq!(sessions.last().map(|s| s.as_str()), Some("X-1/2"));
    let events = state.transcripts.last(&session, 100).unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn router_builds_with_all_routes() {
    let dir = TempDir::new().unwrap();
    let (state, _store) = state_with_store(&dir);
    // Construction alone exercises route registration.
    let _router = router(state);
}
