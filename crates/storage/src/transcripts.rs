// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-attempt transcript logs.
//!
//! One JSONL file per `(issue, attempt)` session under `transcripts/`.
//! Appends are line-atomic: a torn final line (crash mid-write) is dropped
//! on read, never fatal.

use gf_core::{IssueId, SessionId, TranscriptEvent, TranscriptEventKind};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TranscriptsError {
    #[error("transcript io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transcript serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed session id: {0}")]
    BadSession(SessionId),
}

/// Store rooted at `<state_dir>/transcripts/`.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    root: PathBuf,
}

fn sanitize(id: &str) -> String {
    id.chars().map(|c| if c == '/' || c == '\\' { '_' } else { c }).collect()
}

impl TranscriptStore {
    pub fn new(state_dir: &Path) -> Self {
        Self { root: state_dir.join("transcripts") }
    }

    fn issue_dir(&self, issue: &IssueId) -> PathBuf {
        self.root.join(sanitize(issue.as_str()))
    }

    fn session_path(&self, session: &SessionId) -> Result<PathBuf, TranscriptsError> {
        let (issue, seq) = session
            .parts()
            .ok_or_else(|| TranscriptsError::BadSession(session.clone()))?;
        Ok(self.issue_dir(&issue).join(format!("{seq}.jsonl")))
    }

    /// Open an append writer for a session, resuming the event numbering.
    pub fn writer(&self, session: &SessionId) -> Result<TranscriptWriter, TranscriptsError> {
        let path = self.session_path(session)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let next_seq = match read_events(&path) {
            Ok(events) => events.last().map(|e| e.seq + 1).unwrap_or(1),
            Err(_) => 1,
        };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(TranscriptWriter { file, next_seq })
    }

    /// All events of a session, in order.
    pub fn read(&self, session: &SessionId) -> Result<Vec<TranscriptEvent>, TranscriptsError> {
        let path = self.session_path(session)?;
        read_events(&path)
    }

    /// The last `n` events of a session.
    pub fn last(
        &self,
        session: &SessionId,
        n: usize,
    ) -> Result<Vec<TranscriptEvent>, TranscriptsError> {
        let mut events = self.read(session)?;
        if events.len() > n {
            events.drain(..events.len() - n);
        }
        Ok(events)
    }

    /// Session ids for one issue, ordered by attempt.
    pub fn sessions_for_issue(&self, issue: &IssueId) -> Vec<SessionId> {
        let dir = self.issue_dir(issue);
        let Ok(entries) = std::fs::read_dir(&dir) else { return Vec::new() };
        let mut seqs: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                name.to_str()?.strip_suffix(".jsonl")?.parse().ok()
            })
            .collect();
        seqs.sort_unstable();
        seqs.into_iter().map(|seq| SessionId::new(issue, seq)).collect()
    }

    /// Drop transcripts older than `keep_ms` (retention policy).
    pub fn prune_older_than(&self, cutoff: std::time::SystemTime) -> usize {
        let mut pruned = 0;
        let Ok(issues) = std::fs::read_dir(&self.root) else { return 0 };
        for issue_dir in issues.flatten() {
            let Ok(files) = std::fs::read_dir(issue_dir.path()) else { continue };
            for file in files.flatten() {
                let old = file
                    .metadata()
                    .and_then(|m| m.modified())
                    .map(|mtime| mtime < cutoff)
                    .unwrap_or(false);
                if old && std::fs::remove_file(file.path()).is_ok() {
                    pruned += 1;
                }
            }
        }
        pruned
    }
}

fn read_events(path: &Path) -> Result<Vec<TranscriptEvent>, TranscriptsError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut events = Vec::new();
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if !line.ends_with('\n') {
            break;
        }
        match serde_json::from_str(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "dropping malformed transcript line");
                break;
            }
        }
    }
    Ok(events)
}

/// Append handle for one session. Each append is durable once it returns.
pub struct TranscriptWriter {
    file: File,
    next_seq: u64,
}

impl TranscriptWriter {
    /// Record one event; assigns the next sequence number.
    pub fn append(
        &mut self,
        kind: TranscriptEventKind,
        payload: serde_json::Value,
        ts_ms: u64,
    ) -> Result<TranscriptEvent, TranscriptsError> {
        let event = TranscriptEvent { seq: self.next_seq, ts_ms, kind, payload };
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        self.next_seq += 1;
        Ok(event)
    }
}

#[cfg(test)]
#[path = "transcripts_tests.rs"]
mod tests;
