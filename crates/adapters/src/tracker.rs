// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-mirror plus write-through adapter for the external issue tracker.
//!
//! The tracker stores issues as an append-only stream of newline-delimited
//! JSON records; later records supersede earlier ones. Mutations go through
//! the tracker CLI and must succeed there before the local mirror changes.

use crate::exec;
use async_trait::async_trait;
use gf_core::{Issue, IssueFields, IssueId, TrackerStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker binary unreachable: {0}")]
    Unreachable(#[from] std::io::Error),
    #[error("tracker {op} failed (exit {code:?}): {stderr}")]
    CommandFailed { op: &'static str, code: Option<i32>, stderr: String },
    #[error("could not parse issue id from tracker output: {0:?}")]
    ParseId(String),
    #[error("issue not found: {0}")]
    NotFound(IssueId),
}

#[async_trait]
pub trait TrackerAdapter: Send + Sync {
    /// Re-read the record log into the mirror.
    async fn refresh(&self) -> Result<(), TrackerError>;

    /// Whether the record log changed on disk since the last refresh.
    fn changed_on_disk(&self) -> bool;

    /// Snapshot of the materialized view.
    fn mirror(&self) -> Vec<Issue>;

    fn get(&self, id: &IssueId) -> Option<Issue>;

    /// Open issues whose declared dependencies are all closed.
    fn list_ready(&self) -> Vec<Issue>;

    async fn create(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueId, TrackerError>;

    async fn comment(&self, id: &IssueId, author: &str, body: &str)
        -> Result<(), TrackerError>;

    async fn update(&self, id: &IssueId, fields: &IssueFields) -> Result<(), TrackerError>;

    async fn close(&self, id: &IssueId) -> Result<(), TrackerError>;
}

/// Fingerprint of the record log used for cheap change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    mtime: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self { mtime: meta.modified().ok(), len: meta.len() })
    }
}

/// `bd`-style tracker CLI adapter.
pub struct BdTracker {
    bin: String,
    records_path: PathBuf,
    cwd: PathBuf,
    view: Mutex<HashMap<IssueId, Issue>>,
    last_stamp: Mutex<Option<FileStamp>>,
}

impl BdTracker {
    pub fn new(
        bin: impl Into<String>,
        records_path: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bin: bin.into(),
            records_path: records_path.into(),
            cwd: cwd.into(),
            view: Mutex::new(HashMap::new()),
            last_stamp: Mutex::new(None),
        }
    }

    async fn run(&self, op: &'static str, args: &[&str]) -> Result<exec::CmdOutput, TrackerError> {
        let output = exec::run(&self.bin, args, &self.cwd).await?;
        if !output.success() {
            return Err(TrackerError::CommandFailed {
                op,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Parse the record stream. Unparsable records are skipped; later
    /// records win.
    fn parse_records(text: &str) -> HashMap<IssueId, Issue> {
        let mut view = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Issue>(line) {
                Ok(issue) => {
                    view.insert(issue.id.clone(), issue);
                }
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "skipping unparsable tracker record");
                }
            }
        }
        view
    }
}

#[async_trait]
impl TrackerAdapter for BdTracker {
    async fn refresh(&self) -> Result<(), TrackerError> {
        let stamp = FileStamp::of(&self.records_path);
        let text = match tokio::fs::read_to_string(&self.records_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let parsed = Self::parse_records(&text);
        debug!(issues = parsed.len(), "tracker mirror refreshed");
        *self.view.lock() = parsed;
        *self.last_stamp.lock() = stamp;
        Ok(())
    }

    fn changed_on_disk(&self) -> bool {
        FileStamp::of(&self.records_path) != *self.last_stamp.lock()
    }

    fn mirror(&self) -> Vec<Issue> {
        self.view.lock().values().cloned().collect()
    }

    fn get(&self, id: &IssueId) -> Option<Issue> {
        self.view.lock().get(id).cloned()
    }

    fn list_ready(&self) -> Vec<Issue> {
        let view = self.view.lock();
        let closed = |id: &IssueId| {
            view.get(id).map(|dep| dep.status == TrackerStatus::Closed).unwrap_or(false)
        };
        let mut ready: Vec<Issue> = view
            .values()
            .filter(|issue| issue.status == TrackerStatus::Open)
            .filter(|issue| issue.deps.iter().all(closed))
            .cloned()
            .collect();
        ready.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        ready
    }

    async fn create(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueId, TrackerError> {
        let mut args = vec!["create", "--title", title, "--body", body];
        for label in labels {
            args.push("--label");
            args.push(label);
        }
        let output = self.run("create", &args).await?;

        // The tracker prints the new id as the last token of its first line.
        let id = output
            .stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .and_then(|l| l.split_whitespace().last())
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TrackerError::ParseId(output.stdout.clone()))?;

        // Pick up the appended record so the mirror sees the new issue.
        self.refresh().await?;
        Ok(IssueId::from(id))
    }

    async fn comment(
        &self,
        id: &IssueId,
        author: &str,
        body: &str,
    ) -> Result<(), TrackerError> {
        self.run("comment", &["comment", id.as_str(), "--author", author, "--body", body])
            .await?;

        // Tracker accepted; mirror the comment locally.
        let mut view = self.view.lock();
        if let Some(issue) = view.get_mut(id) {
            let comments = issue
                .extra
                .entry("comments".to_string())
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            if let serde_json::Value::Array(items) = comments {
                items.push(serde_json::json!({ "author": author, "body": body }));
            }
        }
        Ok(())
    }

    async fn update(&self, id: &IssueId, fields: &IssueFields) -> Result<(), TrackerError> {
        if self.get(id).is_none() {
            return Err(TrackerError::NotFound(id.clone()));
        }
        let priority;
        let status;
        let mut args = vec!["update".to_string(), id.as_str().to_string()];
        if let Some(ref title) = fields.title {
            args.push("--title".into());
            args.push(title.clone());
        }
        if let Some(ref description) = fields.description {
            args.push("--description".into());
            args.push(description.clone());
        }
        if let Some(ref criteria) = fields.acceptance_criteria {
            args.push("--acceptance".into());
            args.push(criteria.clone());
        }
        if let Some(p) = fields.priority {
            priority = p.to_string();
            args.push("--priority".into());
            args.push(priority);
        }
        if let Some(s) = fields.status {
            status = s.to_string();
            args.push("--status".into());
            args.push(status);
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run("update", &arg_refs).await?;

        let mut view = self.view.lock();
        if let Some(issue) = view.get_mut(id) {
            fields.apply_to(issue);
        }
        Ok(())
    }

    async fn close(&self, id: &IssueId) -> Result<(), TrackerError> {
        self.run("close", &["close", id.as_str()]).await?;
        let mut view = self.view.lock();
        if let Some(issue) = view.get_mut(id) {
            issue.status = TrackerStatus::Closed;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
