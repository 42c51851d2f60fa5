// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-change notifications for the tracker record log.
//!
//! Coarse by design: any event on the watched path wakes the scheduler,
//! which then consults the adapter's own change detection.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

/// Watches a single file and emits unit ticks on change.
pub struct FileWatcher {
    // Held for its Drop; dropping stops the watch.
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl FileWatcher {
    /// Watch the parent directory of `path` (the tracker rewrites the log
    /// by appending; some editors replace the file).
    pub fn watch(path: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel(8);
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            if result.is_ok() {
                // Coalesce: a full channel already holds a pending tick.
                let _ = tx.try_send(());
            }
        })?;

        let target = path.parent().unwrap_or(path);
        watcher.watch(target, RecursiveMode::NonRecursive)?;
        debug!(path = %path.display(), "tracker watch installed");
        Ok(Self { _watcher: watcher, rx })
    }

    /// Await the next change tick.
    pub async fn changed(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}
