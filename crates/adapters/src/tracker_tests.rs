// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::os::unix::fs::PermissionsExt;

fn record(id: &str, status: &str, deps: &[&str], priority: u32) -> String {
    serde_json::json!({
        "id": id,
        "title": format!("issue {id}"),
        "status": status,
        "priority": priority,
        "deps": deps,
        "created_at_ms": 100,
        "updated_at_ms": 100,
    })
    .to_string()
}

fn stub_bin(dir: &Path, body: &str) -> String {
    let path = dir.join("bd-stub");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

fn tracker_with_records(dir: &tempfile::TempDir, lines: &[String]) -> BdTracker {
    let records = dir.path().join("records.ndjson");
    std::fs::write(&records, lines.join("\n")).unwrap();
    BdTracker::new(stub_bin(dir.path(), "exit 0"), records, dir.path())
}

#[tokio::test]
async fn refresh_materializes_last_record_wins() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = tracker_with_records(
        &dir,
        &[
            record("X-1", "open", &[], 2),
            record("X-1", "closed", &[], 2),
            record("X-2", "open", &[], 1),
        ],
    );
    tracker.refresh().await.unwrap();

    assert_eq!(tracker.mirror().len(), 2);
    assert_eq!(
        tracker.get(&IssueId::from("X-1")).unwrap().status,
        TrackerStatus::Closed
    );
}

#[tokio::test]
async fn unparsable_records_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = tracker_with_records(
        &dir,
        &["not json at all".to_string(), record("X-1", "open", &[], 2)],
    );
    tracker.refresh().await.unwrap();
    assert_eq!(tracker.mirror().len(), 1);
}

#[tokio::test]
async fn missing_record_file_is_an_empty_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = BdTracker::new(
        stub_bin(dir.path(), "exit 0"),
        dir.path().join("absent.ndjson"),
        dir.path(),
    );
    tracker.refresh().await.unwrap();
    assert!(tracker.mirror().is_empty());
}

#[tokio::test]
async fn list_ready_gates_on_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = tracker_with_records(
        &dir,
        &[
            record("X-1", "open", &["X-2"], 1),
            record("X-2", "open", &[], 2),
            record("X-3", "open", &["X-4"], 0),
            record("X-4", "closed", &[], 0),
        ],
    );
    tracker.refresh().await.unwrap();

    let ready: Vec<String> =
        tracker.list_ready().iter().map(|i| i.id.as_str().to_string()).collect();
    // X-1 blocked by open X-2; X-3's blocker is closed. Sorted by priority.
    assert_eq!(ready, vec!["X-3", "X-2"]);
}

#[tokio::test]
async fn changed_on_disk_tracks_the_record_file() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = tracker_with_records(&dir, &[record("X-1", "open", &[], 2)]);
    tracker.refresh().await.unwrap();
    assert!(!tracker.changed_on_disk());

    std::fs::write(
        dir.path().join("records.ndjson"),
        format!("{}\n{}", record("X-1", "open", &[], 2), record("X-2", "open", &[], 2)),
    )
    .unwrap();
    assert!(tracker.changed_on_disk());
}

#[tokio::test]
async fn create_parses_emitted_id_and_refreshes() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("records.ndjson");
    // The stub appends the record (as the real tracker would) and prints the id.
    let body = format!(
        "echo '{}' >> {}\necho 'created T-9'",
        record("T-9", "open", &[], 2),
        records.display()
    );
    let tracker = BdTracker::new(stub_bin(dir.path(), &body), records, dir.path());

    let id = tracker.create("a title", "a body", &[]).await.unwrap();
    assert_eq!(id, IssueId::from("T-9"));
    // The refresh picked up the appended record.
    assert!(tracker.get(&id).is_some());
}

#[tokio::test]
async fn failed_mutation_leaves_mirror_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("records.ndjson");
    std::fs::write(&records, record("X-1", "open", &[], 2)).unwrap();
    let tracker = BdTracker::new(stub_bin(dir.path(), "exit 1"), records, dir.path());
    tracker.refresh().await.unwrap();

    let err = tracker.close(&IssueId::from("X-1")).await.err().unwrap();
    assert!(matches!(err, TrackerError::CommandFailed { op: "close", .. }));
    // Mirror unchanged: tracker-first semantics.
    assert_eq!(tracker.get(&IssueId::from("X-1")).unwrap().status, TrackerStatus::Open);
}

#[tokio::test]
async fn comment_appends_to_mirror_comment_list() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = tracker_with_records(&dir, &[record("X-1", "open", &[], 2)]);
    tracker.refresh().await.unwrap();

    tracker.comment(&IssueId::from("X-1"), "gaffer", "blocked on merge conflict").await.unwrap();

    let issue = tracker.get(&IssueId::from("X-1")).unwrap();
    let comments = issue.extra.get("comments").unwrap().as_array().unwrap();
    assert_eq!(comments.last().unwrap()["author"], "gaffer");
}

#[tokio::test]
async fn update_unknown_issue_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = tracker_with_records(&dir, &[]);
    tracker.refresh().await.unwrap();

    let err = tracker
        .update(&IssueId::from("X-404"), &IssueFields::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TrackerError::NotFound(_)));
}

#[tokio::test]
async fn close_updates_mirror_after_tracker_success() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = tracker_with_records(&dir, &[record("X-1", "open", &[], 2)]);
    tracker.refresh().await.unwrap();

    tracker.close(&IssueId::from("X-1")).await.unwrap();
    assert_eq!(tracker.get(&IssueId::from("X-1")).unwrap().status, TrackerStatus::Closed);
}
