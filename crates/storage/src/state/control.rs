// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane, pass, and counter event handlers.

use super::{CommandRecord, EngineState, COMMAND_HISTORY_LIMIT};
use gf_core::Event;

pub(super) fn apply(state: &mut EngineState, event: &Event) {
    match event {
        Event::Paused => state.paused = true,
        Event::Resumed => state.paused = false,

        Event::CommandRecorded { id, op, at_ms } => {
            let duplicate = state.command_history.iter().any(|c| c.id == *id);
            if !duplicate {
                state.command_history.push_back(CommandRecord {
                    id: id.clone(),
                    op: op.clone(),
                    at_ms: *at_ms,
                });
                while state.command_history.len() > COMMAND_HISTORY_LIMIT {
                    state.command_history.pop_front();
                }
            }
        }

        Event::PassStarted { batch, .. } | Event::PassFinished { batch, .. } => {
            state.counters.next_batch_id = state.counters.next_batch_id.max(batch + 1);
        }

        Event::Checkpoint { counters } => {
            state.counters.merge_checkpoint(counters);
        }

        Event::Halted { reason, .. } => {
            state.halted = Some(reason.clone());
        }

        _ => {}
    }
}
