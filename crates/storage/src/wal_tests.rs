// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gf_core::{IssueId, Phase};
use std::io::Write as _;

fn test_event(id: &str) -> Event {
    Event::PhaseChanged { id: IssueId::from(id), phase: Phase::Implementing }
}

#[test]
fn open_creates_file_with_zero_seq() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");

    let wal = Wal::open(&path, 0).unwrap();
    assert!(path.exists());
    assert_eq!(wal.write_seq(), 0);
}

#[test]
fn append_assigns_contiguous_seqs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    let mut wal = Wal::open(&path, 0).unwrap();

    assert_eq!(wal.append(&test_event("X-1")).unwrap(), 1);
    assert_eq!(wal.append(&test_event("X-2")).unwrap(), 2);
    assert_eq!(wal.write_seq(), 2);
}

#[test]
fn reopen_resumes_from_last_seq() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&test_event("X-1")).unwrap();
        wal.append(&test_event("X-2")).unwrap();
    }
    let mut wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 2);
    assert_eq!(wal.append(&test_event("X-3")).unwrap(), 3);
}

#[test]
fn entries_after_filters_by_seq() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    let mut wal = Wal::open(&path, 0).unwrap();
    for id in ["X-1", "X-2", "X-3"] {
        wal.append(&test_event(id)).unwrap();
    }

    let entries = Wal::entries_after(&path, 1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 2);
    assert_eq!(entries[1].seq, 3);
}

#[test]
fn torn_tail_is_dropped_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&test_event("X-1")).unwrap();
    }
    // Simulate a crash mid-append: partial record without newline.
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"seq\":2,\"event\":{\"type\":\"iss").unwrap();
    }

    let mut wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 1);
    // The torn bytes were trimmed, so the next append yields a clean record.
    wal.append(&test_event("X-2")).unwrap();
    let entries = Wal::entries_after(&path, 0).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].seq, 2);
}

#[test]
fn corrupt_middle_record_stops_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    std::fs::write(
        &path,
        "{\"seq\":1,\"event\":{\"type\":\"control:paused\"}}\nnot json\n",
    )
    .unwrap();

    let wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 1);
}

#[test]
fn truncate_before_compacts_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    let mut wal = Wal::open(&path, 0).unwrap();
    for id in ["X-1", "X-2", "X-3"] {
        wal.append(&test_event(id)).unwrap();
    }

    wal.truncate_before(3).unwrap();
    let entries = Wal::entries_after(&path, 0).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].seq, 3);

    // Appending still continues the original numbering.
    assert_eq!(wal.append(&test_event("X-4")).unwrap(), 4);
}

#[test]
fn base_seq_resumes_numbering_after_compaction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        for id in ["X-1", "X-2"] {
            wal.append(&test_event(id)).unwrap();
        }
        wal.truncate_before(3).unwrap(); // empties the log
    }
    // Reopen as the store would, with the snapshot seq as base.
    let mut wal = Wal::open(&path, 2).unwrap();
    assert_eq!(wal.write_seq(), 2);
    assert_eq!(wal.append(&test_event("X-3")).unwrap(), 3);
}

#[test]
fn unknown_event_types_replay_as_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.wal");
    std::fs::write(&path, "{\"seq\":1,\"event\":{\"type\":\"future:verb\",\"x\":1}}\n").unwrap();

    let entries = Wal::entries_after(&path, 0).unwrap();
    assert_eq!(entries[0].event, Event::Unknown);
}
