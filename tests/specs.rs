// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level integration specs crossing crate boundaries.

use gf_core::test_support::issue;
use gf_core::{Config, Event, IssueId, ModelTier, Outcome, Phase, SlotId};
use gf_storage::{Store, StoreOptions, Wal};
use gf_wire::{decode, encode, Request, Response};
use std::path::PathBuf;

#[test]
fn default_config_renders_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gaffer.toml");

    let config = Config::default();
    std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn control_protocol_round_trips_through_frames() {
    let request = Request::Update {
        id: "X-1".into(),
        fields: gf_core::IssueFields {
            priority: Some(0),
            description: Some(String::new()),
            ..Default::default()
        },
    };
    let back: Request = decode(&encode(&request).unwrap()).unwrap();
    assert_eq!(back, request);

    let response = Response::Filed { id: "T-1".into() };
    let back: Response = decode(&encode(&response).unwrap()).unwrap();
    assert_eq!(back, response);
}

/// A full attempt lifecycle written by one process and replayed by the
/// next: the crash-recovery contract between storage and the engine.
#[test]
fn store_replay_reconstructs_an_attempt_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");

    {
        let mut store = Store::open(
            &state_dir,
            StoreOptions { snapshot_interval: 0, reinitialize: false },
        )
        .unwrap();
        store.with_state_mut(|s| s.ensure_slots(1, dir.path()));
        store.commit(Event::IssueDiscovered { issue: issue("X-1"), at_ms: 1 }).unwrap();
        store
            .commit(Event::AttemptStarted {
                id: IssueId::from("X-1"),
                slot: SlotId(0),
                seq: 1,
                tier: ModelTier::Default,
                workspace: PathBuf::from(dir.path().join(".worker-0")),
                at_ms: 2,
            })
            .unwrap();
        store
            .commit(Event::PhaseChanged { id: IssueId::from("X-1"), phase: Phase::Merging })
            .unwrap();
        // Crash here: no AttemptFinished, no snapshot.
    }

    let store = Store::open(
        &state_dir,
        StoreOptions { snapshot_interval: 0, reinitialize: false },
    )
    .unwrap();
    store.with_state(|state| {
        let record = &state.issues["X-1"];
        assert_eq!(record.phase, Phase::Merging);
        assert_eq!(record.attempts.len(), 1);
        assert!(record.attempts[0].is_live());
        assert_eq!(record.assigned_slot, Some(SlotId(0)));
    });

    // The WAL is the audit trail of everything that happened.
    let entries = Wal::entries_after(&state_dir.join("events.wal"), 0).unwrap();
    assert_eq!(entries.len(), 3);
}

#[test]
fn snapshot_compaction_survives_a_second_generation_of_writes() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");

    {
        let mut store = Store::open(
            &state_dir,
            StoreOptions { snapshot_interval: 0, reinitialize: false },
        )
        .unwrap();
        store.commit(Event::IssueDiscovered { issue: issue("X-1"), at_ms: 1 }).unwrap();
        store.write_snapshot().unwrap();
        store
            .commit(Event::AttemptFinished {
                id: IssueId::from("X-1"),
                seq: 1,
                outcome: Outcome::TestFailure,
                feedback: None,
                at_ms: 3,
            })
            .unwrap();
    }
    {
        let mut store = Store::open(
            &state_dir,
            StoreOptions { snapshot_interval: 0, reinitialize: false },
        )
        .unwrap();
        assert_eq!(store.version(), 2);
        store.commit(Event::Paused).unwrap();
        assert_eq!(store.version(), 3);
    }
}
