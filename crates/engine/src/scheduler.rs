// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ready-issue selection.
//!
//! Pure: given the materialized state and the current time, pair idle
//! slots (ascending id) with ready issues (priority, then created-at,
//! then id). Dependency-gated and backoff-gated.

use gf_core::{IssueId, Phase, SlotId, TrackerStatus};
use gf_storage::EngineState;

/// Issues eligible for dispatch right now, in selection order.
///
/// `skip_deps` drops the dependency gate (the `--skip-deps` escape hatch).
pub fn ready_issues(state: &EngineState, now_ms: u64, skip_deps: bool) -> Vec<IssueId> {
    let mut ready: Vec<_> = state
        .issues
        .values()
        .filter(|record| record.phase == Phase::Pending)
        .filter(|record| record.issue.status == TrackerStatus::Open)
        .filter(|record| record.next_retry_at_ms.is_none_or(|at| at <= now_ms))
        .filter(|record| skip_deps || record.deps_satisfied(|dep| state.dep_done(dep)))
        .collect();
    ready.sort_by(|a, b| a.issue.order_key().cmp(&b.issue.order_key()));
    ready.into_iter().map(|record| record.issue.id.clone()).collect()
}

/// Pair idle slots with ready issues.
pub fn pick_dispatches(state: &EngineState, now_ms: u64, skip_deps: bool) -> Vec<(SlotId, IssueId)> {
    let idle: Vec<SlotId> =
        state.slots.values().filter(|slot| slot.is_idle()).map(|slot| slot.id).collect();
    idle.into_iter().zip(ready_issues(state, now_ms, skip_deps)).collect()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
