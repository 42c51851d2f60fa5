// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sh(script: &str) -> RunnerSpec {
    RunnerSpec {
        argv: vec!["/bin/sh".into(), "-c".into(), script.into()],
        cwd: std::env::temp_dir(),
        env: Vec::new(),
        idle_timeout: Duration::from_secs(5),
        wall_timeout: Duration::from_secs(10),
        grace: Duration::from_millis(200),
    }
}

async fn drain(mut rx: mpsc::Receiver<RunnerEvent>) -> (Vec<String>, ExitStatus) {
    let mut lines = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            RunnerEvent::Line(line) => lines.push(line),
            RunnerEvent::Exit(status) => return (lines, status),
        }
    }
    panic!("stream ended without exit event");
}

#[tokio::test]
async fn natural_exit_streams_lines_then_exit() {
    let rx = spawn(sh("echo one; echo two"), CancellationToken::new()).unwrap();
    let (lines, status) = drain(rx).await;

    assert_eq!(lines, vec!["one", "two"]);
    assert_eq!(status.reason, ExitReason::Natural);
    assert_eq!(status.code, Some(0));
    assert!(status.success());
}

#[tokio::test]
async fn nonzero_exit_code_is_reported() {
    let rx = spawn(sh("exit 3"), CancellationToken::new()).unwrap();
    let (_, status) = drain(rx).await;

    assert_eq!(status.reason, ExitReason::Natural);
    assert_eq!(status.code, Some(3));
    assert!(!status.success());
}

#[tokio::test]
async fn stderr_is_captured_as_tail() {
    let rx = spawn(sh("echo oops >&2; exit 1"), CancellationToken::new()).unwrap();
    let (_, status) = drain(rx).await;

    assert!(status.stderr_tail.contains("oops"), "tail: {:?}", status.stderr_tail);
}

#[tokio::test]
async fn idle_timeout_kills_a_silent_child() {
    let mut spec = sh("sleep 30");
    spec.idle_timeout = Duration::from_millis(100);
    let rx = spawn(spec, CancellationToken::new()).unwrap();
    let (_, status) = drain(rx).await;

    assert_eq!(status.reason, ExitReason::IdleTimeout);
    assert!(status.reason.is_timeout());
}

#[tokio::test]
async fn wall_timeout_caps_a_chatty_child() {
    let mut spec = sh("while true; do echo tick; sleep 0.05; done");
    spec.wall_timeout = Duration::from_millis(300);
    let rx = spawn(spec, CancellationToken::new()).unwrap();
    let (lines, status) = drain(rx).await;

    assert!(!lines.is_empty(), "expected some output before the wall");
    assert_eq!(status.reason, ExitReason::WallTimeout);
}

#[tokio::test]
async fn cancellation_is_classified_distinctly() {
    let cancel = CancellationToken::new();
    let rx = spawn(sh("sleep 30"), cancel.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let (_, status) = drain(rx).await;
    assert_eq!(status.reason, ExitReason::Cancelled);
    assert!(!status.reason.is_timeout());
}

#[tokio::test]
async fn sigterm_ignoring_child_is_force_killed() {
    let mut spec = sh("trap '' TERM; sleep 30");
    spec.idle_timeout = Duration::from_millis(100);
    spec.grace = Duration::from_millis(100);
    let rx = spawn(spec, CancellationToken::new()).unwrap();
    let (_, status) = drain(rx).await;

    assert_eq!(status.reason, ExitReason::IdleTimeout);
    assert!(status.force_killed);
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let spec = RunnerSpec::new(
        vec!["/definitely/not/here".into()],
        std::env::temp_dir(),
    );
    let err = spawn(spec, CancellationToken::new()).err().unwrap();
    assert!(matches!(err, RunnerError::Spawn { .. }));
}

#[test]
fn empty_argv_is_rejected() {
    let spec = RunnerSpec::new(vec![], std::env::temp_dir());
    // No runtime needed; the error is synchronous.
    let err = spawn(spec, CancellationToken::new()).err().unwrap();
    assert!(matches!(err, RunnerError::EmptyArgv));
}
