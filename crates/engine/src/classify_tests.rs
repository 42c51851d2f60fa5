// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn exit(reason: ExitReason, code: Option<i32>, stderr: &str) -> ExitStatus {
    ExitStatus { reason, code, force_killed: false, stderr_tail: stderr.to_string() }
}

#[parameterized(
    idle = { ExitReason::IdleTimeout },
    wall = { ExitReason::WallTimeout },
)]
fn timeouts_classify_as_timeout(reason: ExitReason) {
    let status = exit(reason, None, "");
    assert_eq!(classify_failure(&status, None, ""), Outcome::Timeout);
}

#[test]
fn cancellation_is_user_interrupt() {
    let status = exit(ExitReason::Cancelled, None, "");
    assert_eq!(classify_failure(&status, None, ""), Outcome::UserInterrupt);
}

#[test]
fn structured_error_kind_wins_over_patterns() {
    let status = exit(ExitReason::Natural, Some(1), "assertion failed in foo");
    assert_eq!(
        classify_failure(&status, Some("transient"), ""),
        Outcome::TransientFailure
    );
}

#[test]
fn unknown_structured_kind_falls_through() {
    let status = exit(ExitReason::Natural, Some(1), "");
    assert_eq!(classify_failure(&status, Some("mystery"), ""), Outcome::Crash);
}

#[test]
fn retryable_exit_code_is_transient() {
    let status = exit(ExitReason::Natural, Some(75), "");
    assert_eq!(classify_failure(&status, None, ""), Outcome::TransientFailure);
}

#[parameterized(
    refused = { "connect: Connection refused" },
    reset = { "Connection reset by peer" },
    rate = { "429 rate limit exceeded" },
    dns = { "DNS resolution failure" },
)]
fn network_stderr_is_transient(stderr: &str) {
    let status = exit(ExitReason::Natural, Some(1), stderr);
    assert_eq!(classify_failure(&status, None, ""), Outcome::TransientFailure);
}

#[test]
fn test_output_in_stderr_is_test_failure() {
    let status = exit(ExitReason::Natural, Some(1), "error: 3 tests failed");
    assert_eq!(classify_failure(&status, None, ""), Outcome::TestFailure);
}

#[test]
fn test_output_in_transcript_tail_is_test_failure() {
    let status = exit(ExitReason::Natural, Some(1), "");
    assert_eq!(
        classify_failure(&status, None, "running 5 tests\ntest failed: auth::login"),
        Outcome::TestFailure
    );
}

#[test]
fn unclassifiable_nonzero_exit_is_crash() {
    let status = exit(ExitReason::Natural, Some(1), "segfault?");
    assert_eq!(classify_failure(&status, None, ""), Outcome::Crash);
}

// =============================================================================
// Implementer-specific classification
// =============================================================================

#[test]
fn ready_and_clean_exit_is_success() {
    let status = exit(ExitReason::Natural, Some(0), "");
    assert_eq!(classify_implementer(&status, true, None, ""), None);
}

#[test]
fn clean_exit_without_ready_signal_is_crash() {
    let status = exit(ExitReason::Natural, Some(0), "");
    assert_eq!(classify_implementer(&status, false, None, ""), Some(Outcome::Crash));
}

#[test]
fn failed_implementer_defers_to_failure_classification() {
    let status = exit(ExitReason::Natural, Some(75), "");
    assert_eq!(
        classify_implementer(&status, false, None, ""),
        Some(Outcome::TransientFailure)
    );
}
