// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write as _;

fn session(issue: &str, seq: u32) -> SessionId {
    SessionId::new(&IssueId::from(issue), seq)
}

fn text(value: &str) -> serde_json::Value {
    serde_json::Value::String(value.to_string())
}

#[test]
fn append_and_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    let session = session("X-1", 1);

    let mut writer = store.writer(&session).unwrap();
    writer.append(TranscriptEventKind::StdoutText, text("hello"), 10).unwrap();
    writer.append(TranscriptEventKind::Exit, serde_json::json!({"code": 0}), 20).unwrap();

    let events = store.read(&session).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].seq, 1);
    assert_eq!(events[1].seq, 2);
    assert_eq!(events[1].kind, TranscriptEventKind::Exit);
}

#[test]
fn reopened_writer_resumes_numbering() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    let session = session("X-1", 1);

    store
        .writer(&session)
        .unwrap()
        .append(TranscriptEventKind::StdoutText, text("a"), 1)
        .unwrap();
    store
        .writer(&session)
        .unwrap()
        .append(TranscriptEventKind::StdoutText, text("b"), 2)
        .unwrap();

    let events = store.read(&session).unwrap();
    assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn missing_session_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    assert!(store.read(&session("X-404", 1)).unwrap().is_empty());
}

#[test]
fn torn_final_line_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    let session = session("X-1", 1);
    store
        .writer(&session)
        .unwrap()
        .append(TranscriptEventKind::StdoutText, text("ok"), 1)
        .unwrap();

    let path = dir.path().join("transcripts/X-1/1.jsonl");
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(b"{\"seq\":2,\"ts_ms\":5,\"ki").unwrap();

    let events = store.read(&session).unwrap();
    assert_eq!(events.len(), 1);
}

#[test]
fn last_n_returns_the_tail() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    let session = session("X-1", 1);
    let mut writer = store.writer(&session).unwrap();
    for i in 0..10 {
        writer.append(TranscriptEventKind::StdoutText, text(&format!("line {i}")), i).unwrap();
    }

    let tail = store.last(&session, 3).unwrap();
    assert_eq!(tail.len(), 3);
    assert_eq!(tail[0].seq, 8);
}

#[test]
fn sessions_for_issue_are_ordered_by_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    for seq in [3, 1, 2] {
        store
            .writer(&session("X-1", seq))
            .unwrap()
            .append(TranscriptEventKind::StdoutText, text("x"), 1)
            .unwrap();
    }

    let sessions = store.sessions_for_issue(&IssueId::from("X-1"));
    assert_eq!(
        sessions.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        vec!["X-1/1", "X-1/2", "X-1/3"]
    );
}

#[test]
fn prune_removes_only_old_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    store
        .writer(&session("X-1", 1))
        .unwrap()
        .append(TranscriptEventKind::StdoutText, text("x"), 1)
        .unwrap();

    // Everything is newer than a cutoff in the past.
    let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
    assert_eq!(store.prune_older_than(past), 0);

    // A cutoff in the future sweeps the session away.
    let future = std::time::SystemTime::now() + std::time::Duration::from_secs(3600);
    assert_eq!(store.prune_older_than(future), 1);
    assert!(store.read(&session("X-1", 1)).unwrap().is_empty());
}

#[test]
fn issue_ids_with_separators_are_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let store = TranscriptStore::new(dir.path());
    let session = session("proj/X-1", 1);
    store
        .writer(&session)
        .unwrap()
        .append(TranscriptEventKind::StdoutText, text("x"), 1)
        .unwrap();

    assert!(dir.path().join("transcripts/proj_X-1").exists());
}
