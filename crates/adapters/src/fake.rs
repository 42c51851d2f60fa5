// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for engine tests.

use crate::tracker::{TrackerAdapter, TrackerError};
use crate::vcs::{DiffSummary, MergeResult, VcsError, VcsGateway};
use async_trait::async_trait;
use gf_core::{Issue, IssueFields, IssueId, SlotId, TrackerStatus};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Scripted [`VcsGateway`]: queue diff and merge results, record calls.
pub struct FakeVcs {
    repo_root: PathBuf,
    workspaces: Mutex<BTreeSet<PathBuf>>,
    diffs: Mutex<VecDeque<DiffSummary>>,
    merges: Mutex<VecDeque<MergeResult>>,
    fail_create: AtomicBool,
    pub calls: Mutex<Vec<String>>,
    pub restored: Mutex<Vec<Vec<String>>>,
}

impl FakeVcs {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            workspaces: Mutex::new(BTreeSet::new()),
            diffs: Mutex::new(VecDeque::new()),
            merges: Mutex::new(VecDeque::new()),
            fail_create: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            restored: Mutex::new(Vec::new()),
        }
    }

    /// Queue the next `diff_summary` result (FIFO; default is an empty diff).
    pub fn push_diff(&self, diff: DiffSummary) {
        self.diffs.lock().push_back(diff);
    }

    /// Queue the next `squash_into_main` result (default: clean success).
    pub fn push_merge(&self, merge: MergeResult) {
        self.merges.lock().push_back(merge);
    }

    pub fn fail_next_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn workspace_exists(&self, path: &Path) -> bool {
        self.workspaces.lock().contains(path)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl VcsGateway for FakeVcs {
    async fn create_workspace(&self, slot: SlotId) -> Result<PathBuf, VcsError> {
        self.record(format!("create:{slot}"));
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(VcsError::WorkspaceCreation { slot, detail: "scripted failure".into() });
        }
        let path = slot.workspace_path(&self.repo_root);
        std::fs::create_dir_all(&path)
            .map_err(|e| VcsError::WorkspaceCreation { slot, detail: e.to_string() })?;
        self.workspaces.lock().insert(path.clone());
        Ok(path)
    }

    async fn remove_workspace(&self, path: &Path) {
        self.record(format!("remove:{}", path.display()));
        self.workspaces.lock().remove(path);
    }

    async fn diff_summary(&self, path: &Path) -> Result<DiffSummary, VcsError> {
        self.record(format!("diff:{}", path.display()));
        Ok(self.diffs.lock().pop_front().unwrap_or_default())
    }

    async fn commit(&self, path: &Path, _message: &str) -> Result<bool, VcsError> {
        self.record(format!("commit:{}", path.display()));
        Ok(true)
    }

    async fn squash_into_main(&self, path: &Path) -> Result<MergeResult, VcsError> {
        self.record(format!("squash:{}", path.display()));
        Ok(self
            .merges
            .lock()
            .pop_front()
            .unwrap_or(MergeResult { ok: true, conflict: false }))
    }

    async fn restore_paths(&self, path: &Path, paths: &[String]) -> Result<(), VcsError> {
        self.record(format!("restore:{}", path.display()));
        self.restored.lock().push(paths.to_vec());
        Ok(())
    }

    async fn list_orphan_workspaces(&self, num_slots: u32) -> Result<Vec<PathBuf>, VcsError> {
        Ok(self
            .workspaces
            .lock()
            .iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(".worker-"))
                    .and_then(|n| n.parse::<u32>().ok())
                    .is_some_and(|index| index >= num_slots)
            })
            .cloned()
            .collect())
    }
}

/// In-memory [`TrackerAdapter`] with scripted failures.
pub struct FakeTracker {
    issues: Mutex<HashMap<IssueId, Issue>>,
    next_id: AtomicU64,
    fail_mutations: AtomicBool,
    dirty: AtomicBool,
    pub comments: Mutex<Vec<(IssueId, String, String)>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self {
            issues: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_mutations: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            comments: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, issue: Issue) {
        self.issues.lock().insert(issue.id.clone(), issue);
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn status_of(&self, id: &IssueId) -> Option<TrackerStatus> {
        self.issues.lock().get(id).map(|i| i.status)
    }

    fn check_mutation(&self, op: &'static str) -> Result<(), TrackerError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(TrackerError::CommandFailed {
                op,
                code: Some(1),
                stderr: "scripted tracker failure".into(),
            });
        }
        Ok(())
    }
}

impl Default for FakeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackerAdapter for FakeTracker {
    async fn refresh(&self) -> Result<(), TrackerError> {
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn changed_on_disk(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn mirror(&self) -> Vec<Issue> {
        self.issues.lock().values().cloned().collect()
    }

    fn get(&self, id: &IssueId) -> Option<Issue> {
        self.issues.lock().get(id).cloned()
    }

    fn list_ready(&self) -> Vec<Issue> {
        let issues = self.issues.lock();
        let closed = |id: &IssueId| {
            issues.get(id).map(|dep| dep.status == TrackerStatus::Closed).unwrap_or(false)
        };
        let mut ready: Vec<Issue> = issues
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
        _labels: &[String],
    ) -> Result<IssueId, TrackerError> {
        self.check_mutation("create")?;
        let id = IssueId::from(format!("T-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let issue = Issue {
            id: id.clone(),
            title: title.to_string(),
            description: body.to_string(),
            acceptance_criteria: String::new(),
            priority: 2,
            status: TrackerStatus::Open,
            deps: Vec::new(),
            created_at_ms: 0,
            updated_at_ms: 0,
            extra: serde_json::Map::new(),
        };
        self.issues.lock().insert(id.clone(), issue);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(id)
    }

    async fn comment(
        &self,
        id: &IssueId,
        author: &str,
        body: &str,
    ) -> Result<(), TrackerError> {
        self.check_mutation("comment")?;
        if !self.issues.lock().contains_key(id) {
            return Err(TrackerError::NotFound(id.clone()));
        }
        self.comments.lock().push((id.clone(), author.to_string(), body.to_string()));
        Ok(())
    }

    async fn update(&self, id: &IssueId, fields: &IssueFields) -> Result<(), TrackerError> {
        self.check_mutation("update")?;
        let mut issues = self.issues.lock();
        let issue = issues.get_mut(id).ok_or_else(|| TrackerError::NotFound(id.clone()))?;
        fields.apply_to(issue);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self, id: &IssueId) -> Result<(), TrackerError> {
        self.check_mutation("close")?;
        let mut issues = self.issues.lock();
        let issue = issues.get_mut(id).ok_or_else(|| TrackerError::NotFound(id.clone()))?;
        issue.status = TrackerStatus::Closed;
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }
}
