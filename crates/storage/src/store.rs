// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-writer durable store: WAL + snapshot + materialized state.
//!
//! All mutations go through [`Store::commit`] on the scheduler's fiber.
//! External readers hold a [`StateReader`] and take copy-on-read clones;
//! `state_version` (the WAL sequence) lets them detect missed updates.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::EngineState;
use crate::wal::{Wal, WalError};
use fs2::FileExt;
use gf_core::Event;
use parking_lot::Mutex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const SNAPSHOT_FILE: &str = "state.snap";
const WAL_FILE: &str = "events.wal";
const LOCK_FILE: &str = "store.lock";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state directory already locked by another engine: {0}")]
    Locked(PathBuf),
    #[error("snapshot load failed (pass --force to reinitialize): {0}")]
    SnapshotLoad(#[source] SnapshotError),
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Commits between automatic snapshots; 0 disables them.
    pub snapshot_interval: u64,
    /// Wipe durable state instead of refusing to start on a bad load.
    pub reinitialize: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { snapshot_interval: 500, reinitialize: false }
    }
}

/// Read-only handle for control/dashboard consumers.
#[derive(Clone)]
pub struct StateReader {
    state: Arc<Mutex<EngineState>>,
    version: Arc<AtomicU64>,
}

impl StateReader {
    /// Copy-on-read clone of the whole state.
    pub fn snapshot(&self) -> EngineState {
        self.state.lock().clone()
    }

    /// Run a closure against the state without cloning.
    pub fn with<T>(&self, f: impl FnOnce(&EngineState) -> T) -> T {
        f(&self.state.lock())
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

/// The durable state store. Single writer: the scheduler loop.
pub struct Store {
    dir: PathBuf,
    wal: Wal,
    state: Arc<Mutex<EngineState>>,
    version: Arc<AtomicU64>,
    snapshot_interval: u64,
    // Held for the process lifetime; dropping releases the exclusive lock.
    _lockfile: File,
}

impl Store {
    /// Open the store, acquiring an exclusive lock on the directory and
    /// materializing state from snapshot + WAL replay.
    ///
    /// A loadable-but-corrupt store refuses to open unless
    /// `options.reinitialize` is set.
    pub fn open(dir: &Path, options: StoreOptions) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;

        let lockfile = File::create(dir.join(LOCK_FILE))?;
        lockfile
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked(dir.to_path_buf()))?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let wal_path = dir.join(WAL_FILE);

        if options.reinitialize {
            warn!(dir = %dir.display(), "reinitializing state store");
            for path in [&snapshot_path, &wal_path] {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }

        let (mut state, base_seq) = if snapshot_path.exists() {
            let snapshot = Snapshot::load(&snapshot_path).map_err(StoreError::SnapshotLoad)?;
            (snapshot.state, snapshot.seq)
        } else {
            (EngineState::default(), 0)
        };

        let wal = Wal::open(&wal_path, base_seq)?;
        let mut replayed = 0usize;
        for entry in Wal::entries_after(&wal_path, base_seq)? {
            state.apply_event(&entry.event);
            replayed += 1;
        }
        let version = wal.write_seq();
        info!(
            dir = %dir.display(),
            snapshot_seq = base_seq,
            replayed,
            version,
            "state store loaded"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            wal,
            state: Arc::new(Mutex::new(state)),
            version: Arc::new(AtomicU64::new(version)),
            snapshot_interval: options.snapshot_interval,
            _lockfile: lockfile,
        })
    }

    /// Durably record an event and apply it; returns the new state version.
    pub fn commit(&mut self, event: Event) -> Result<u64, StoreError> {
        let seq = self.wal.append(&event)?;
        self.state.lock().apply_event(&event);
        self.version.store(seq, Ordering::Release);

        if self.snapshot_interval > 0 && seq % self.snapshot_interval == 0 {
            self.write_snapshot()?;
        }
        Ok(seq)
    }

    /// Write a snapshot at the current version and compact the WAL.
    pub fn write_snapshot(&mut self) -> Result<(), StoreError> {
        let version = self.version();
        let state = self.state.lock().clone();
        Snapshot::new(version, state).write(&self.dir.join(SNAPSHOT_FILE))?;
        self.wal.truncate_before(version + 1)?;
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Cheap shared read access for the single writer.
    pub fn with_state<T>(&self, f: impl FnOnce(&EngineState) -> T) -> T {
        f(&self.state.lock())
    }

    /// Mutable access for startup reconciliation only (before the loop runs).
    pub fn with_state_mut<T>(&self, f: impl FnOnce(&mut EngineState) -> T) -> T {
        f(&mut self.state.lock())
    }

    pub fn reader(&self) -> StateReader {
        StateReader { state: Arc::clone(&self.state), version: Arc::clone(&self.version) }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
