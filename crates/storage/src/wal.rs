// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log of engine events.
//!
//! One JSON record per line: `{"seq": N, "event": {...}}`. A torn final
//! record (crash mid-write) is dropped and the file trimmed back to the
//! last good line on open.

use gf_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wal serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One durable WAL record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only event log.
pub struct Wal {
    path: PathBuf,
    file: File,
    write_seq: u64,
}

impl Wal {
    /// Open (or create) the log, trimming any torn tail.
    ///
    /// `base_seq` is the snapshot's sequence number; numbering continues
    /// from it when the log has been compacted away.
    pub fn open(path: &Path, base_seq: u64) -> Result<Self, WalError> {
        let (entries, good_len) = Self::scan(path)?;
        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0).max(base_seq);

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() > good_len {
            warn!(path = %path.display(), "dropping torn wal tail");
            file.set_len(good_len)?;
        }
        Ok(Self { path: path.to_path_buf(), file, write_seq })
    }

    /// Read every well-formed entry and the byte length they span.
    fn scan(path: &Path) -> Result<(Vec<WalEntry>, u64), WalError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut good_len = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            if !line.ends_with('\n') {
                // Torn write: no trailing newline.
                break;
            }
            match serde_json::from_str::<WalEntry>(&line) {
                Ok(entry) => {
                    good_len += read as u64;
                    entries.push(entry);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "stopping replay at corrupt wal record");
                    break;
                }
            }
        }
        Ok((entries, good_len))
    }

    /// Last appended sequence number (0 when empty).
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Durably append one event; returns its sequence number.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let mut line = serde_json::to_string(&WalEntry { seq, event: event.clone() })?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        self.write_seq = seq;
        Ok(seq)
    }

    /// Entries with `seq > after`, in order.
    pub fn entries_after(path: &Path, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let (entries, _) = Self::scan(path)?;
        Ok(entries.into_iter().filter(|e| e.seq > after).collect())
    }

    /// Drop entries with `seq < before` (snapshot compaction).
    pub fn truncate_before(&mut self, before: u64) -> Result<(), WalError> {
        let (entries, _) = Self::scan(&self.path)?;
        let keep: Vec<&WalEntry> = entries.iter().filter(|e| e.seq >= before).collect();

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        for entry in keep {
            let mut line = serde_json::to_string(entry)?;
            line.push('\n');
            file.write_all(line.as_bytes())?;
        }
        file.sync_data()?;

        self.file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
