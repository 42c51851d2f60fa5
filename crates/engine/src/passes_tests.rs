// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gf_adapters::FakeTracker;
use gf_core::test_support::issue;
use gf_core::TrackerStatus;

#[test]
fn parse_file_proposal() {
    let proposal = parse_proposal(
        r#"{"type":"propose","op":"file","title":"split the parser","labels":["planner"]}"#,
    );
    assert_eq!(
        proposal,
        Some(Proposal::File {
            title: "split the parser".into(),
            body: String::new(),
            labels: vec!["planner".into()],
        })
    );
}

#[test]
fn parse_update_proposal_with_fields() {
    let proposal =
        parse_proposal(r#"{"type":"propose","op":"update","id":"X-1","fields":{"priority":0}}"#);
    let Some(Proposal::Update { id, fields }) = proposal else { panic!("wrong variant") };
    assert_eq!(id, "X-1");
    assert_eq!(fields.priority, Some(0));
}

#[test]
fn non_proposal_lines_are_ignored() {
    assert_eq!(parse_proposal("thinking about the backlog..."), None);
    assert_eq!(parse_proposal(r#"{"type":"note","op":"file"}"#), None);
    // Known tag, malformed body: skipped, not fatal.
    assert_eq!(parse_proposal(r#"{"type":"propose","op":"file"}"#), None);
}

async fn run_script(tracker: &FakeTracker, script: &str) -> PassReport {
    let agents = gf_core::AgentsConfig {
        timeout_seconds: 10,
        idle_timeout_seconds: 10,
        grace_seconds: 1,
        ..Default::default()
    };
    let project = gf_core::ProjectConfig {
        repo_root: std::env::temp_dir(),
        ..Default::default()
    };
    run_pass(
        PassKind::Planner,
        1,
        &format!("sh -c '{script}'"),
        &agents,
        &project,
        tracker,
        &CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn planner_pass_files_proposed_issues() {
    let tracker = FakeTracker::new();
    let report = run_script(
        &tracker,
        r#"echo "{\"type\":\"propose\",\"op\":\"file\",\"title\":\"new task\"}""#,
    )
    .await;

    assert_eq!(report, PassReport { proposals: 1, rejected: 0 });
    let mirror = tracker.mirror();
    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror[0].title, "new task");
}

#[tokio::test]
async fn pass_applies_comments_and_updates() {
    let tracker = FakeTracker::new();
    tracker.seed(issue("X-1"));
    let report = run_script(
        &tracker,
        concat!(
            r#"echo "{\"type\":\"propose\",\"op\":\"comment\",\"id\":\"X-1\",\"body\":\"stale\"}";"#,
            r#"echo "{\"type\":\"propose\",\"op\":\"update\",\"id\":\"X-1\",\"fields\":{\"status\":\"closed\"}}""#,
        ),
    )
    .await;

    assert_eq!(report.proposals, 2);
    assert_eq!(tracker.comments.lock().len(), 1);
    assert_eq!(tracker.status_of(&"X-1".into()), Some(TrackerStatus::Closed));
}

#[tokio::test]
async fn tracker_rejections_are_counted_not_fatal() {
    let tracker = FakeTracker::new();
    tracker.fail_mutations(true);
    let report = run_script(
        &tracker,
        r#"echo "{\"type\":\"propose\",\"op\":\"file\",\"title\":\"nope\"}""#,
    )
    .await;

    assert_eq!(report, PassReport { proposals: 0, rejected: 1 });
}

#[tokio::test]
async fn chatty_pass_agent_with_no_proposals_is_fine() {
    let tracker = FakeTracker::new();
    let report = run_script(&tracker, "echo analyzing; echo done").await;
    assert_eq!(report.proposals, 0);
}

#[tokio::test]
async fn failing_pass_agent_still_applies_earlier_proposals() {
    let tracker = FakeTracker::new();
    let report = run_script(
        &tracker,
        r#"echo "{\"type\":\"propose\",\"op\":\"file\",\"title\":\"early\"}"; exit 1"#,
    )
    .await;

    assert_eq!(report.proposals, 1);
    assert_eq!(tracker.mirror().len(), 1);
}
