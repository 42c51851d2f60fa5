// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation after a crash or restart.
//!
//! Re-derives slot state from the store plus VCS inspection: in-flight
//! attempts are finalized without consuming budget, interrupted merges are
//! resolved by probing the workspace against the mainline, stale locks are
//! released, and orphan workspaces are reaped.

use crate::runloop::EngineError;
use gf_adapters::{TrackerAdapter, VcsGateway};
use gf_core::{Clock, Event, IssueId, Outcome, Phase, SlotId};
use gf_storage::Store;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub requeued: usize,
    pub completed: usize,
    pub locks_released: usize,
    pub orphans_reaped: usize,
}

struct Stranded {
    slot: Option<SlotId>,
    issue: IssueId,
    phase: Phase,
    live_seq: Option<u32>,
    workspace: Option<PathBuf>,
}

/// Reconcile durable state with reality before the loop starts.
pub async fn reconcile<C: Clock>(
    store: &mut Store,
    vcs: &dyn VcsGateway,
    tracker: &dyn TrackerAdapter,
    clock: &C,
    num_workers: u32,
    repo_root: &Path,
) -> Result<RecoveryReport, EngineError> {
    let mut report = RecoveryReport::default();
    let now = clock.epoch_ms();

    // Slot table follows config; state for dropped slots is gone, their
    // workspaces are reaped as orphans below.
    store.with_state_mut(|state| state.ensure_slots(num_workers, repo_root));

    // Every issue holding a slot (or claiming an active phase) was in
    // flight when the previous engine died.
    let stranded: Vec<Stranded> = store.with_state(|state| {
        state
            .issues
            .values()
            .filter(|record| record.phase.is_active())
            .map(|record| Stranded {
                slot: record.assigned_slot,
                issue: record.issue.id.clone(),
                phase: record.phase,
                live_seq: record.live_attempt().map(|a| a.seq),
                workspace: record.workspace_path.clone(),
            })
            .collect()
    });

    for item in stranded {
        let resolved_as_merged = if item.phase == Phase::Merging {
            probe_merged(vcs, item.workspace.as_deref()).await
        } else {
            false
        };

        if let Some(seq) = item.live_seq {
            let outcome =
                if resolved_as_merged { Outcome::Success } else { Outcome::UserInterrupt };
            store.commit(Event::AttemptFinished {
                id: item.issue.clone(),
                seq,
                outcome,
                feedback: Some("engine restart".into()),
                at_ms: now,
            })?;
        }

        if resolved_as_merged {
            // The squash already landed; complete and close idempotently.
            store.commit(Event::IssueCompleted { id: item.issue.clone(), at_ms: now })?;
            if let Err(e) = tracker.close(&item.issue).await {
                warn!(issue = %item.issue, error = %e, "close after recovered merge failed");
            }
            if let Some(ref workspace) = item.workspace {
                vcs.remove_workspace(workspace).await;
            }
            report.completed += 1;
        } else {
            store.commit(Event::IssueRequeued { id: item.issue.clone(), retry_at_ms: None })?;
            if item.phase == Phase::Merging {
                // Half-merged workspace is suspect; rebuild it next time.
                if let Some(ref workspace) = item.workspace {
                    vcs.remove_workspace(workspace).await;
                }
            }
            report.requeued += 1;
        }

        if let Some(slot) = item.slot {
            store.commit(Event::SlotReleased { slot })?;
        }
    }

    // All slots are idle now; any surviving lock is an orphan.
    let lock_names: Vec<String> =
        store.with_state(|state| state.locks.keys().cloned().collect());
    for name in lock_names {
        store.commit(Event::LockReleased { name })?;
        report.locks_released += 1;
    }

    // Workspaces of slots that no longer exist in config.
    match vcs.list_orphan_workspaces(num_workers).await {
        Ok(orphans) => {
            for path in orphans {
                vcs.remove_workspace(&path).await;
                report.orphans_reaped += 1;
            }
        }
        Err(e) => warn!(error = %e, "orphan workspace listing failed"),
    }

    info!(
        requeued = report.requeued,
        completed = report.completed,
        locks_released = report.locks_released,
        orphans_reaped = report.orphans_reaped,
        "recovery reconcile done"
    );
    Ok(report)
}

/// A merging workspace with no remaining diff means the squash landed
/// before the crash.
async fn probe_merged(vcs: &dyn VcsGateway, workspace: Option<&Path>) -> bool {
    let Some(workspace) = workspace else { return false };
    match vcs.diff_summary(workspace).await {
        Ok(diff) => diff.is_empty(),
        Err(e) => {
            warn!(workspace = %workspace.display(), error = %e, "merge probe failed; requeueing");
            false
        }
    }
}

#[cfg(test)]
#[path = "recover_tests.rs"]
mod tests;
