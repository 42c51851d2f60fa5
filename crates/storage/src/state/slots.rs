// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot and lock event handlers.

use super::{EngineState, Lock};
use gf_core::{Event, SlotState};

pub(super) fn apply(state: &mut EngineState, event: &Event) {
    match event {
        Event::SlotReleased { slot } => {
            if let Some(worker) = state.slots.get_mut(&slot.0) {
                worker.state = SlotState::Idle;
                worker.current_issue = None;
                worker.started_at_ms = None;
            }
        }

        Event::LockAcquired { name, slot, at_ms } => {
            state
                .locks
                .insert(name.clone(), Lock { holder: *slot, acquired_at_ms: *at_ms });
        }

        Event::LockReleased { name } => {
            state.locks.remove(name);
        }

        _ => {}
    }
}
