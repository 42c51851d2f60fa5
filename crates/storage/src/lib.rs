// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gf-storage: durable engine state.
//!
//! Event-sourced: a write-ahead log of engine events plus periodic
//! compressed snapshots. State is materialized by replay through an
//! idempotent `apply_event`.

pub mod snapshot;
pub mod state;
pub mod store;
pub mod transcripts;
pub mod wal;

pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{CommandRecord, EngineState, Lock};
pub use store::{StateReader, Store, StoreError, StoreOptions};
pub use transcripts::{TranscriptStore, TranscriptWriter, TranscriptsError};
pub use wal::{Wal, WalEntry, WalError};
