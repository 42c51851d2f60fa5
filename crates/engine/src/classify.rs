// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification for agent exits.
//!
//! Maps a runner exit, the agent's optional structured final error line,
//! and the transcript/stderr tail onto the outcome taxonomy. Structured
//! signals win over pattern sniffing.

use gf_core::Outcome;
use gf_runner::{ExitReason, ExitStatus};

/// Exit codes the agent contract reserves for retryable failures
/// (EX_TEMPFAIL from sysexits).
const RETRYABLE_EXIT_CODES: &[i32] = &[75];

/// Network-ish stderr fragments that mark a failure transient.
const TRANSIENT_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "network",
    "timed out",
    "temporarily unavailable",
    "rate limit",
    "dns",
    "tls",
    "503",
    "502",
];

/// Fragments indicating the repository's test suite failed.
const TEST_PATTERNS: &[&str] =
    &["test failed", "tests failed", "test failure", "assertion failed", "failed test"];

/// Structured error kind from a final `{type: "error", kind, message}` line.
fn from_error_kind(kind: &str) -> Option<Outcome> {
    match kind {
        "transient" | "network" | "rate_limit" => Some(Outcome::TransientFailure),
        "test_failure" | "tests" => Some(Outcome::TestFailure),
        "timeout" => Some(Outcome::Timeout),
        _ => None,
    }
}

fn matches_any(haystack: &str, patterns: &[&str]) -> bool {
    let lower = haystack.to_ascii_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

/// Classify a failed agent run.
///
/// `error_kind` is the `kind` of the agent's structured final error line,
/// when it printed one; `tail` is recent stdout for pattern sniffing.
pub fn classify_failure(exit: &ExitStatus, error_kind: Option<&str>, tail: &str) -> Outcome {
    match exit.reason {
        ExitReason::Cancelled => return Outcome::UserInterrupt,
        ExitReason::IdleTimeout | ExitReason::WallTimeout => return Outcome::Timeout,
        ExitReason::Natural => {}
    }

    if let Some(outcome) = error_kind.and_then(from_error_kind) {
        return outcome;
    }
    if exit.code.is_some_and(|c| RETRYABLE_EXIT_CODES.contains(&c)) {
        return Outcome::TransientFailure;
    }
    if matches_any(&exit.stderr_tail, TRANSIENT_PATTERNS) {
        return Outcome::TransientFailure;
    }
    if matches_any(&exit.stderr_tail, TEST_PATTERNS) || matches_any(tail, TEST_PATTERNS) {
        return Outcome::TestFailure;
    }
    Outcome::Crash
}

/// Classify an implementer run.
///
/// A clean exit without `READY_FOR_REVIEW` is a crash: the contract says a
/// successful implementer announces review readiness before exiting 0.
pub fn classify_implementer(
    exit: &ExitStatus,
    ready: bool,
    error_kind: Option<&str>,
    tail: &str,
) -> Option<Outcome> {
    if exit.success() && ready {
        return None;
    }
    if exit.success() {
        return Some(Outcome::Crash);
    }
    Some(classify_failure(exit, error_kind, tail))
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
