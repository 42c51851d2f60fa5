// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure lifecycle decisions.
//!
//! Given a record whose latest attempt has just been finalized, decide
//! what happens next: complete, requeue (with or without backoff), block,
//! or fail. No I/O here; the loop executes the returned actions.

use gf_core::{IssueRecord, ModelTier, Outcome, RetryConfig};

/// What the loop should do with the issue now.
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    /// Close out: merge landed.
    Complete,
    /// Back to `pending`; `delay_ms` gates the scheduler (transient backoff).
    Requeue { delay_ms: Option<u64> },
    /// Terminal until a human intervenes.
    Block { reason: String },
    /// Unrecoverable per-issue failure (workspace creation).
    Fail { kind: Outcome },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: NextAction,
    /// Human-readable note appended to the tracker, if any.
    pub comment: Option<String>,
    /// Whether the slot workspace should be reaped. Merge conflicts
    /// preserve it for a human.
    pub remove_workspace: bool,
}

impl Decision {
    fn complete() -> Self {
        Self { action: NextAction::Complete, comment: None, remove_workspace: true }
    }

    fn requeue(delay_ms: Option<u64>) -> Self {
        Self { action: NextAction::Requeue { delay_ms }, comment: None, remove_workspace: true }
    }

    fn block(reason: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            action: NextAction::Block { reason: reason.into() },
            comment: Some(comment.into()),
            remove_workspace: true,
        }
    }
}

/// Decide the next step after `outcome` finalized the latest attempt.
pub fn decide(record: &IssueRecord, outcome: Outcome, retry: &RetryConfig) -> Decision {
    let id = record.id();
    match outcome {
        Outcome::Success => Decision::complete(),

        // Does not consume budget; straight back into the ready pool.
        Outcome::UserInterrupt => Decision::requeue(None),

        Outcome::WorkspaceCreationFailed => Decision {
            action: NextAction::Fail { kind: outcome },
            comment: Some(format!("{id}: workspace creation failed; issue marked failed")),
            remove_workspace: true,
        },

        Outcome::TransientFailure => {
            let streak = record.transient_streak();
            if streak > retry.max_transient_retries {
                Decision::block(
                    "persistent transient failures",
                    format!(
                        "{id}: still failing after {} transient retries; blocking for a human",
                        retry.max_transient_retries
                    ),
                )
            } else {
                Decision::requeue(Some(retry.backoff_ms(streak)))
            }
        }

        // Blocks immediately; the workspace is preserved for a human.
        Outcome::MergeConflict => Decision {
            action: NextAction::Block { reason: "merge conflict".into() },
            comment: Some(format!(
                "{id}: squash into main hit a conflict; workspace preserved for manual resolution"
            )),
            remove_workspace: false,
        },

        Outcome::ManifestViolation => {
            if record.outcome_count(Outcome::ManifestViolation) >= 2 {
                Decision::block(
                    "repeated manifest violation",
                    format!("{id}: agent touched files outside the declared manifest twice"),
                )
            } else {
                over_budget(record, retry).unwrap_or_else(|| Decision::requeue(None))
            }
        }

        Outcome::Crash => {
            if record.outcome_count(Outcome::Crash) >= 2 {
                Decision::block(
                    "repeated crash",
                    format!("{id}: agent crashed twice without a classifiable signal"),
                )
            } else {
                over_budget(record, retry).unwrap_or_else(|| Decision::requeue(None))
            }
        }

        Outcome::Timeout => {
            if record.budgeted_attempts() >= 2 {
                Decision::block(
                    "timeout; needs decomposition",
                    format!(
                        "{id}: timed out after {} attempts; planner should break this task up",
                        record.budgeted_attempts()
                    ),
                )
            } else {
                over_budget(record, retry).unwrap_or_else(|| Decision::requeue(None))
            }
        }

        Outcome::TestFailure => {
            let cap = retry.max_total_attempts.min(5);
            if record.budgeted_attempts() >= cap {
                Decision::block(
                    "test failures exhausted the attempt cap",
                    format!("{id}: test suite still failing after {cap} attempts"),
                )
            } else {
                Decision::requeue(None)
            }
        }

        Outcome::ReviewRejected => {
            if record.outcome_count(Outcome::ReviewRejected) >= retry.max_review_iterations {
                Decision::block(
                    "review iterations exhausted",
                    format!(
                        "{id}: reviewer rejected {} times; escalating to a human",
                        retry.max_review_iterations
                    ),
                )
            } else {
                over_budget(record, retry).unwrap_or_else(|| Decision::requeue(None))
            }
        }
    }
}

/// Overall budget gate for budget-consuming retry paths.
fn over_budget(record: &IssueRecord, retry: &RetryConfig) -> Option<Decision> {
    if record.budgeted_attempts() >= retry.max_total_attempts {
        let id = record.id();
        Some(Decision::block(
            "attempt budget exhausted",
            format!(
                "{id}: {} budgeted attempts used (cap {}); last error: {}",
                record.budgeted_attempts(),
                retry.max_total_attempts,
                record
                    .last_error_kind
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "unknown".into()),
            ),
        ))
    } else {
        None
    }
}

/// Model tier for the next attempt: escalate after K consecutive budgeted
/// failures (review rejections included), capped by nothing else.
pub fn tier_for_next(record: &IssueRecord, retry: &RetryConfig) -> ModelTier {
    if record.consecutive_budgeted_failures() >= retry.escalate_after_attempts {
        ModelTier::Escalated
    } else {
        ModelTier::Default
    }
}

/// Feedback to carry into the next attempt's prompt context.
pub fn carry_feedback(record: &IssueRecord) -> Option<String> {
    record.attempts.iter().rev().find_map(|a| a.feedback.clone())
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
