// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue lifecycle event handlers.

use super::EngineState;
use gf_core::{Attempt, Event, IssueRecord, Phase, SessionId, SlotState};

pub(super) fn apply(state: &mut EngineState, event: &Event) {
    match event {
        Event::IssueDiscovered { issue, at_ms } => {
            state
                .issues
                .entry(issue.id.clone())
                .or_insert_with(|| IssueRecord::new(issue.clone(), *at_ms));
        }

        Event::IssueMirrored { issue, at_ms } => {
            match state.issues.get_mut(&issue.id) {
                Some(record) => {
                    record.issue = issue.clone();
                    record.updated_at_ms = *at_ms;
                }
                None => {
                    state
                        .issues
                        .insert(issue.id.clone(), IssueRecord::new(issue.clone(), *at_ms));
                }
            }
        }

        Event::IssueRemoved { id } => {
            state.issues.remove(id);
            for slot in state.slots.values_mut() {
                if slot.current_issue.as_ref() == Some(id) {
                    slot.current_issue = None;
                    slot.state = SlotState::Idle;
                    slot.started_at_ms = None;
                }
            }
        }

        Event::AttemptStarted { id, slot, seq, tier, workspace, at_ms } => {
            let Some(record) = state.issues.get_mut(id) else { return };
            let already = record.attempts.iter().any(|a| a.seq == *seq);
            if !already {
                record.attempts.push(Attempt {
                    seq: *seq,
                    started_at_ms: *at_ms,
                    finished_at_ms: None,
                    tier: *tier,
                    outcome: None,
                    feedback: None,
                    session: SessionId::new(id, *seq),
                });
            }
            record.phase = Phase::Assigned;
            record.assigned_slot = Some(*slot);
            record.workspace_path = Some(workspace.clone());
            record.next_retry_at_ms = None;
            record.updated_at_ms = *at_ms;

            if let Some(worker) = state.slots.get_mut(&slot.0) {
                worker.state = SlotState::Busy;
                worker.current_issue = Some(id.clone());
                worker.started_at_ms = Some(*at_ms);
            }
        }

        Event::PhaseChanged { id, phase } => {
            if let Some(record) = state.issues.get_mut(id) {
                record.phase = *phase;
            }
        }

        Event::AttemptFinished { id, seq, outcome, feedback, at_ms } => {
            let Some(record) = state.issues.get_mut(id) else { return };
            let Some(attempt) = record.attempts.iter_mut().find(|a| a.seq == *seq) else {
                return;
            };
            if attempt.outcome.is_some() {
                // Already finalized; replay no-op.
                return;
            }
            attempt.outcome = Some(*outcome);
            attempt.finished_at_ms = Some(*at_ms);
            attempt.feedback = feedback.clone();
            record.updated_at_ms = *at_ms;
            if outcome.is_failure() {
                record.last_error_kind = Some(*outcome);
                if outcome.consumes_budget() {
                    state.counters.failed_attempts += 1;
                }
            }
        }

        Event::IssueRequeued { id, retry_at_ms } => {
            if let Some(record) = state.issues.get_mut(id) {
                record.phase = Phase::Pending;
                record.assigned_slot = None;
                record.next_retry_at_ms = *retry_at_ms;
            }
        }

        Event::IssueCompleted { id, at_ms } => {
            if let Some(record) = state.issues.get_mut(id) {
                if record.phase != Phase::Completed {
                    state.counters.successful_completions += 1;
                }
                record.phase = Phase::Completed;
                record.assigned_slot = None;
                record.issue.status = gf_core::TrackerStatus::Closed;
                record.updated_at_ms = *at_ms;
            }
        }

        Event::IssueBlocked { id, at_ms, .. } => {
            if let Some(record) = state.issues.get_mut(id) {
                record.phase = Phase::Blocked;
                record.assigned_slot = None;
                record.updated_at_ms = *at_ms;
            }
        }

        Event::IssueFailed { id, kind, at_ms } => {
            if let Some(record) = state.issues.get_mut(id) {
                record.phase = Phase::Failed;
                record.last_error_kind = Some(*kind);
                record.assigned_slot = None;
                record.updated_at_ms = *at_ms;
            }
        }

        Event::IssueReopened { id, at_ms } => {
            if let Some(record) = state.issues.get_mut(id) {
                if record.phase.is_terminal() {
                    record.phase = Phase::Pending;
                    record.last_error_kind = None;
                    record.next_retry_at_ms = None;
                    record.updated_at_ms = *at_ms;
                }
            }
        }

        _ => {}
    }
}
