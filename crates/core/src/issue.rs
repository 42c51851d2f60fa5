// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tracker-side view of an issue.
//!
//! The engine mirrors issues from the external tracker and never mutates
//! the mirror except through the tracker adapter's write operations.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier assigned by the external tracker (e.g. `X-17`). Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub String);

impl IssueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IssueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IssueId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for IssueId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for IssueId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for IssueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Issue status in the tracker's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerStatus {
    Open,
    InProgress,
    Closed,
}

crate::simple_display! {
    TrackerStatus {
        Open => "open",
        InProgress => "in_progress",
        Closed => "closed",
    }
}

/// Mirror of a tracker issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: String,
    /// Smaller is higher priority.
    #[serde(default)]
    pub priority: u32,
    pub status: TrackerStatus,
    /// Ids of issues that must be completed before this one may start.
    #[serde(default)]
    pub deps: Vec<IssueId>,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
    /// Tracker-defined fields the engine does not interpret, except
    /// `manifest` (see [`Issue::manifest`]).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Issue {
    /// Declared file manifest for attempts on this issue.
    ///
    /// Read from `extra["manifest"]` (array of path strings). Empty means
    /// the attempt may modify any file.
    pub fn manifest(&self) -> Vec<String> {
        match self.extra.get("manifest") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Ordering key for ready-issue selection: priority, then creation
    /// time, then id (lexicographic).
    pub fn order_key(&self) -> (u32, u64, &str) {
        (self.priority, self.created_at_ms, self.id.as_str())
    }
}

/// Partial field update for a tracker issue.
///
/// `None` leaves the field untouched; an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TrackerStatus>,
}

impl IssueFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.acceptance_criteria.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    /// Apply this partial update to a mirror record.
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(ref title) = self.title {
            issue.title = title.clone();
        }
        if let Some(ref description) = self.description {
            issue.description = description.clone();
        }
        if let Some(ref criteria) = self.acceptance_criteria {
            issue.acceptance_criteria = criteria.clone();
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
