// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler loop: a single-owner control fiber.
//!
//! One iteration applies queued control commands, refreshes the tracker
//! mirror, folds in slot completions, dispatches ready issues to idle
//! slots, advances the periodic meta-passes, and publishes a status
//! snapshot. All state-store writes happen here; parallelism lives inside
//! the slot drivers.

use crate::bus::EventBus;
use crate::control::{ControlMsg, EngineHandle};
use crate::decision::{self, NextAction};
use crate::pipeline::PipelineDeps;
use crate::pool::{DispatchOrder, SlotEvent, WorkerPool};
use crate::{passes, recover, scheduler};
use gf_adapters::{TrackerAdapter, VcsGateway};
use gf_core::{
    Clock, CommandId, Config, Event, Issue, IssueId, Outcome, PassKind, Phase, SessionId,
    TrackerStatus, MAIN_MERGE_LOCK,
};
use gf_storage::{Store, StoreError, TranscriptStore};
use gf_wire::{error_kind, IssueDetail, IssueSummary, Request, Response, SlotEntry, StatusSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Loop tick upper bound; the loop also wakes on events.
const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("engine halted: {0}")]
    Halted(String),
}

/// CLI-level run options layered over the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_iterations: Option<u64>,
    pub dry_run: bool,
    /// Restrict dispatch to a single issue.
    pub only_issue: Option<IssueId>,
    /// Dispatch even when blockers are not completed.
    pub skip_deps: bool,
    /// Author name for engine-written tracker comments.
    pub author: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_iterations: None,
            dry_run: false,
            only_issue: None,
            skip_deps: false,
            author: "gaffer".into(),
        }
    }
}

/// The engine loop and everything it owns.
pub struct Engine<C: Clock> {
    config: Config,
    opts: RunOptions,
    store: Store,
    tracker: Arc<dyn TrackerAdapter>,
    vcs: Arc<dyn VcsGateway>,
    pool: WorkerPool,
    bus: Arc<EventBus>,
    clock: C,
    cmd_rx: mpsc::Receiver<ControlMsg>,
    status_tx: watch::Sender<StatusSnapshot>,
    cancel: CancellationToken,
    started: Instant,
    iteration: u64,
    shutting_down: bool,
    pending_cmds: Vec<ControlMsg>,
    pending_events: Vec<(gf_core::SlotId, SlotEvent)>,
    wake_rx: Option<mpsc::Receiver<()>>,
}

impl<C: Clock> Engine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        opts: RunOptions,
        store: Store,
        tracker: Arc<dyn TrackerAdapter>,
        vcs: Arc<dyn VcsGateway>,
        bus: Arc<EventBus>,
        transcripts: TranscriptStore,
        clock: C,
    ) -> (Self, EngineHandle) {
        let deps = Arc::new(PipelineDeps {
            vcs: Arc::clone(&vcs),
            transcripts,
            bus: Arc::clone(&bus),
            clock: clock.clone(),
            agents: config.agents.clone(),
            retry: config.retry.clone(),
            project: config.project.clone(),
        });
        let pool = WorkerPool::new(config.agents.num_workers, deps);

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());
        let cancel = CancellationToken::new();
        let handle = EngineHandle::new(cmd_tx, status_rx, store.reader(), cancel.clone());

        let engine = Self {
            config,
            opts,
            store,
            tracker,
            vcs,
            pool,
            bus,
            clock,
            cmd_rx,
            status_tx,
            cancel,
            started: Instant::now(),
            iteration: 0,
            shutting_down: false,
            pending_cmds: Vec::new(),
            pending_events: Vec::new(),
            wake_rx: None,
        };
        (engine, handle)
    }

    /// External wake signal (e.g. the tracker file watcher). The loop
    /// also ticks on its own, so this only shortens latency.
    pub fn wake_sender(&mut self) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel(4);
        self.wake_rx = Some(rx);
        tx
    }

    /// Run until shutdown. Consumes the engine.
    pub async fn run(mut self) -> Result<(), EngineError> {
        recover::reconcile(
            &mut self.store,
            self.vcs.as_ref(),
            self.tracker.as_ref(),
            &self.clock,
            self.config.agents.num_workers,
            &self.config.project.repo_root,
        )
        .await?;

        if let Err(e) = self.tracker.refresh().await {
            warn!(error = %e, "initial tracker refresh failed; starting with empty mirror");
        } else {
            self.sync_mirror()?;
        }
        self.iteration = self.store.with_state(|s| s.counters.total_iterations);
        info!(iteration = self.iteration, "engine loop starting");

        let result = self.iterate().await;
        self.drain_and_persist().await;
        match result {
            Ok(()) => {
                info!("engine loop stopped");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "engine loop halted");
                Err(e)
            }
        }
    }

    async fn iterate(&mut self) -> Result<(), EngineError> {
        loop {
            self.iteration += 1;

            self.apply_commands().await?;
            self.refresh_mirror_if_changed().await?;
            self.apply_slot_events().await?;

            if let Some(reason) = self.store.with_state(|s| s.halted.clone()) {
                return Err(EngineError::Halted(reason));
            }

            let paused = self.store.with_state(|s| s.paused);
            if !paused && !self.shutting_down && !self.cancel.is_cancelled() {
                if !self.opts.dry_run {
                    self.dispatch_ready()?;
                }
                self.run_due_passes().await?;
            }

            if self.config.daemon.checkpoint_interval > 0
                && self.iteration % self.config.daemon.checkpoint_interval == 0
            {
                self.checkpoint()?;
            }
            self.publish_status();

            if self.cancel.is_cancelled() {
                return Ok(());
            }
            if self.shutting_down && self.pool.all_idle() {
                return Ok(());
            }
            if let Some(max) = self.opts.max_iterations {
                if self.iteration >= max {
                    info!(max, "max iterations reached");
                    return Ok(());
                }
            }

            self.wait_for_work().await;
        }
    }

    /// Sleep until the next event: slot completion, control command,
    /// cancellation, or the bounded tick.
    async fn wait_for_work(&mut self) {
        let wake_rx = self.wake_rx.as_mut();
        let woken = async move {
            match wake_rx {
                Some(rx) => {
                    rx.recv().await;
                }
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            event = self.pool.events_rx.recv() => {
                if let Some(event) = event {
                    self.pending_events.push(event);
                }
            }
            msg = self.cmd_rx.recv() => {
                if let Some(msg) = msg {
                    self.pending_cmds.push(msg);
                }
            }
            _ = woken => {}
            _ = tokio::time::sleep(TICK) => {}
        }
    }

    // -------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------

    async fn apply_commands(&mut self) -> Result<(), EngineError> {
        let mut queued: Vec<ControlMsg> = self.pending_cmds.drain(..).collect();
        while let Ok(msg) = self.cmd_rx.try_recv() {
            queued.push(msg);
        }
        for msg in queued {
            let response = self.handle_request(msg.request).await?;
            let _ = msg.reply.send(response);
        }
        Ok(())
    }

    async fn handle_request(&mut self, request: Request) -> Result<Response, EngineError> {
        if request.is_mutation() {
            self.commit(Event::CommandRecorded {
                id: CommandId::generate(),
                op: request.op_name().to_string(),
                at_ms: self.clock.epoch_ms(),
            })?;
        }

        let response = match request {
            Request::Ping => Response::Pong,
            Request::Status => Response::Status { status: self.build_status(false) },

            Request::Pause => {
                if self.store.with_state(|s| s.paused) {
                    Response::noted("already_paused")
                } else {
                    self.commit(Event::Paused)?;
                    info!("dispatch paused");
                    Response::ok()
                }
            }

            Request::Resume => {
                if !self.store.with_state(|s| s.paused) {
                    Response::noted("not_paused")
                } else {
                    self.commit(Event::Resumed)?;
                    info!("dispatch resumed");
                    Response::ok()
                }
            }

            Request::Interrupt => {
                info!("interrupt: cancelling all busy slots");
                self.pool.cancel_all();
                Response::ok()
            }

            Request::Shutdown => {
                info!("shutdown requested; draining");
                self.shutting_down = true;
                Response::ok()
            }

            Request::File { title, description, priority, labels } => {
                match self.tracker.create(&title, &description, &labels).await {
                    Ok(id) => {
                        if let Some(priority) = priority {
                            let fields = gf_core::IssueFields {
                                priority: Some(priority),
                                ..Default::default()
                            };
                            if let Err(e) = self.tracker.update(&id, &fields).await {
                                warn!(issue = %id, error = %e, "priority update after create failed");
                            }
                        }
                        if let Some(issue) = self.tracker.get(&id) {
                            self.commit(Event::IssueDiscovered {
                                issue,
                                at_ms: self.clock.epoch_ms(),
                            })?;
                        }
                        Response::Filed { id: id.as_str().to_string() }
                    }
                    Err(e) => Response::error(error_kind::TRACKER, e.to_string()),
                }
            }

            Request::Comment { id, author, body } => {
                let id = IssueId::from(id);
                match self.tracker.comment(&id, &author, &body).await {
                    Ok(()) => {
                        self.mirror_one(&id)?;
                        Response::ok()
                    }
                    Err(e) => Response::error(error_kind::TRACKER, e.to_string()),
                }
            }

            Request::Update { id, fields } => {
                if fields.is_empty() {
                    return Ok(Response::error(error_kind::INVALID_REQUEST, "no fields to update"));
                }
                let id = IssueId::from(id);
                match self.tracker.update(&id, &fields).await {
                    Ok(()) => {
                        self.mirror_one(&id)?;
                        // Reopening a closed issue is an explicit user action.
                        let terminal =
                            self.store.with_state(|s| {
                                s.issues.get(&id).map(|r| r.phase.is_terminal()).unwrap_or(false)
                            });
                        if terminal && fields.status == Some(TrackerStatus::Open) {
                            self.commit(Event::IssueReopened {
                                id: id.clone(),
                                at_ms: self.clock.epoch_ms(),
                            })?;
                        }
                        Response::ok()
                    }
                    Err(e) => Response::error(error_kind::TRACKER, e.to_string()),
                }
            }

            Request::Inspect { id } => {
                match self.store.with_state(|s| s.issues.get(id.as_str()).map(IssueDetail::from)) {
                    Some(issue) => Response::Issue { issue },
                    None => Response::error(error_kind::NOT_FOUND, format!("issue {id} not found")),
                }
            }

            Request::List { phase, limit } => {
                let mut issues: Vec<IssueSummary> = self.store.with_state(|s| {
                    s.issues
                        .values()
                        .filter(|r| phase.as_deref().is_none_or(|p| r.phase.to_string() == p))
                        .map(IssueSummary::from)
                        .collect()
                });
                issues.sort_by(|a, b| {
                    (a.priority, &a.id).cmp(&(b.priority, &b.id))
                });
                if let Some(limit) = limit {
                    issues.truncate(limit);
                }
                Response::Issues { issues }
            }
        };
        Ok(response)
    }

    /// Refresh one issue's mirror in the engine record after a tracker write.
    fn mirror_one(&mut self, id: &IssueId) -> Result<(), EngineError> {
        if let Some(issue) = self.tracker.get(id) {
            self.commit(Event::IssueMirrored { issue, at_ms: self.clock.epoch_ms() })?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Tracker mirror
    // -------------------------------------------------------------------

    async fn refresh_mirror_if_changed(&mut self) -> Result<(), EngineError> {
        if !self.tracker.changed_on_disk() {
            return Ok(());
        }
        match self.tracker.refresh().await {
            Ok(()) => self.sync_mirror(),
            Err(e) => {
                warn!(error = %e, "tracker refresh failed; keeping previous mirror");
                Ok(())
            }
        }
    }

    /// Fold the tracker's materialized view into engine records.
    fn sync_mirror(&mut self) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        let mirror: Vec<Issue> = self.tracker.mirror();

        let known: std::collections::HashMap<IssueId, Issue> = self
            .store
            .with_state(|s| s.issues.values().map(|r| (r.issue.id.clone(), r.issue.clone())).collect());

        for issue in &mirror {
            match known.get(&issue.id) {
                None => {
                    debug!(issue = %issue.id, "discovered");
                    self.commit(Event::IssueDiscovered { issue: issue.clone(), at_ms: now })?;
                    self.bus.publish_issue(
                        serde_json::json!({"id": issue.id.as_str(), "event": "discovered"}),
                        now,
                    );
                }
                Some(current) if current != issue => {
                    self.commit(Event::IssueMirrored { issue: issue.clone(), at_ms: now })?;
                }
                Some(_) => {}
            }
        }

        // Records whose issue vanished from the tracker (deletion).
        let mirror_ids: std::collections::HashSet<&IssueId> =
            mirror.iter().map(|i| &i.id).collect();
        for id in known.keys() {
            if !mirror_ids.contains(id) {
                let slot = self.store.with_state(|s| {
                    s.issues.get(id).and_then(|r| r.assigned_slot)
                });
                if let Some(slot) = slot {
                    self.pool.cancel(slot);
                }
                info!(issue = %id, "removed with tracker record");
                self.commit(Event::IssueRemoved { id: id.clone() })?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Slot events
    // -------------------------------------------------------------------

    async fn apply_slot_events(&mut self) -> Result<(), EngineError> {
        let mut queued: Vec<(gf_core::SlotId, SlotEvent)> = self.pending_events.drain(..).collect();
        while let Ok(event) = self.pool.events_rx.try_recv() {
            queued.push(event);
        }
        for (slot, event) in queued {
            match event {
                SlotEvent::Phase { issue, phase } => {
                    self.commit(Event::PhaseChanged { id: issue.clone(), phase })?;
                    if phase == Phase::Merging {
                        self.commit(Event::LockAcquired {
                            name: MAIN_MERGE_LOCK.to_string(),
                            slot,
                            at_ms: self.clock.epoch_ms(),
                        })?;
                    }
                    self.bus.publish_issue(
                        serde_json::json!({"id": issue.as_str(), "phase": phase.to_string()}),
                        self.clock.epoch_ms(),
                    );
                }
                SlotEvent::Signal { issue, signal } => {
                    // Context-expansion requests are denied by default; the
                    // agent proceeds with what it has.
                    info!(issue = %issue, signal = signal.name(), "context request denied");
                }
                SlotEvent::Finished { issue, seq, report } => {
                    self.finish_attempt(slot, issue, seq, report).await?;
                }
            }
        }
        Ok(())
    }

    async fn finish_attempt(
        &mut self,
        slot: gf_core::SlotId,
        issue: IssueId,
        seq: u32,
        report: crate::pipeline::AttemptReport,
    ) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();

        let lock_held = self.store.with_state(|s| {
            s.locks.get(MAIN_MERGE_LOCK).map(|l| l.holder == slot).unwrap_or(false)
        });
        if lock_held {
            self.commit(Event::LockReleased { name: MAIN_MERGE_LOCK.to_string() })?;
        }

        self.commit(Event::AttemptFinished {
            id: issue.clone(),
            seq,
            outcome: report.outcome,
            feedback: report.feedback.clone(),
            at_ms: now,
        })?;
        self.commit(Event::SlotReleased { slot })?;

        let Some(record) = self.store.with_state(|s| s.issues.get(&issue).cloned()) else {
            warn!(issue = %issue, "attempt finished for unknown issue");
            return Ok(());
        };
        let workspace = record
            .workspace_path
            .clone()
            .unwrap_or_else(|| slot.workspace_path(&self.config.project.repo_root));

        let decision = decision::decide(&record, report.outcome, &self.config.retry);
        info!(
            issue = %issue,
            seq,
            outcome = %report.outcome,
            action = ?decision.action,
            "attempt finished"
        );

        match &decision.action {
            NextAction::Complete => {
                self.commit(Event::IssueCompleted { id: issue.clone(), at_ms: now })?;
                if let Err(e) = self.tracker.close(&issue).await {
                    // Engine-side completion stands; the mirror will catch
                    // up on the next sync or the close is retried by hand.
                    warn!(issue = %issue, error = %e, "tracker close failed");
                }
            }
            NextAction::Requeue { delay_ms } => {
                let retry_at_ms = delay_ms.map(|d| now + d);
                self.commit(Event::IssueRequeued { id: issue.clone(), retry_at_ms })?;
            }
            NextAction::Block { reason } => {
                self.commit(Event::IssueBlocked {
                    id: issue.clone(),
                    reason: reason.clone(),
                    at_ms: now,
                })?;
            }
            NextAction::Fail { kind } => {
                self.commit(Event::IssueFailed { id: issue.clone(), kind: *kind, at_ms: now })?;
            }
        }

        if let Some(ref comment) = decision.comment {
            if let Err(e) = self.tracker.comment(&issue, &self.opts.author, comment).await {
                warn!(issue = %issue, error = %e, "tracker comment failed");
            }
        }
        if decision.remove_workspace {
            self.vcs.remove_workspace(&workspace).await;
        }

        self.bus.forget_session(&SessionId::new(&issue, seq));
        self.bus.publish_issue(
            serde_json::json!({
                "id": issue.as_str(),
                "outcome": report.outcome.to_string(),
            }),
            now,
        );
        self.bus.publish_worker(
            serde_json::json!({"slot": slot.0, "state": "idle"}),
            now,
        );
        Ok(())
    }

    // -------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------

    fn dispatch_ready(&mut self) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        let skip_deps = self.opts.skip_deps;
        let picks = self.store.with_state(|s| scheduler::pick_dispatches(s, now, skip_deps));

        for (slot, issue_id) in picks {
            if let Some(ref only) = self.opts.only_issue {
                if &issue_id != only {
                    continue;
                }
            }
            if !self.pool.is_idle(slot) {
                continue;
            }
            let Some(record) = self.store.with_state(|s| s.issues.get(&issue_id).cloned()) else {
                continue;
            };

            let seq = record.next_seq();
            let tier = decision::tier_for_next(&record, &self.config.retry);
            let workspace = slot.workspace_path(&self.config.project.repo_root);
            let last_outcome = record.attempts.last().and_then(|a| a.outcome);

            let order = DispatchOrder {
                issue_id: issue_id.clone(),
                seq,
                tier,
                title: record.issue.title.clone(),
                description: record.issue.description.clone(),
                acceptance_criteria: record.issue.acceptance_criteria.clone(),
                manifest: record.issue.manifest(),
                feedback: decision::carry_feedback(&record),
                reduced_scope: last_outcome == Some(Outcome::Timeout),
                strict_manifest: last_outcome == Some(Outcome::ManifestViolation),
            };

            // Persist the dispatch before the slot sees it: an attempt
            // exists durably before any agent runs.
            self.commit(Event::AttemptStarted {
                id: issue_id.clone(),
                slot,
                seq,
                tier,
                workspace: workspace.clone(),
                at_ms: now,
            })?;

            if self.pool.try_dispatch(slot, order) {
                info!(issue = %issue_id, slot = %slot, seq, tier = %tier, "dispatched");
                self.bus.publish_worker(
                    serde_json::json!({"slot": slot.0, "issue": issue_id.as_str()}),
                    now,
                );
            } else {
                // Slot raced busy; roll the dispatch back.
                warn!(issue = %issue_id, slot = %slot, "dispatch raced; rolling back");
                self.commit(Event::AttemptFinished {
                    id: issue_id.clone(),
                    seq,
                    outcome: Outcome::UserInterrupt,
                    feedback: Some("dispatch raced a busy slot".into()),
                    at_ms: now,
                })?;
                self.commit(Event::IssueRequeued { id: issue_id, retry_at_ms: None })?;
                self.commit(Event::SlotReleased { slot })?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Meta passes
    // -------------------------------------------------------------------

    async fn run_due_passes(&mut self) -> Result<(), EngineError> {
        let passes_config = self.config.passes.clone();
        let due = [
            (
                PassKind::Planner,
                passes_config.planner_enabled,
                passes_config.planner_interval,
                passes_config.planner_agent,
            ),
            (
                PassKind::Quality,
                passes_config.quality_enabled,
                passes_config.quality_interval,
                passes_config.quality_agent,
            ),
        ];

        for (kind, enabled, interval, command) in due {
            if !enabled || interval == 0 || self.iteration % interval != 0 || self.opts.dry_run {
                continue;
            }
            let batch = self.store.with_state(|s| s.counters.next_batch_id);
            self.commit(Event::PassStarted {
                kind,
                iteration: self.iteration,
                batch,
                at_ms: self.clock.epoch_ms(),
            })?;

            // Shares the loop fiber: dispatch pauses while the pass runs.
            let report = passes::run_pass(
                kind,
                batch,
                &command,
                &self.config.agents,
                &self.config.project,
                self.tracker.as_ref(),
                &self.cancel,
            )
            .await;

            self.commit(Event::PassFinished {
                kind,
                batch,
                proposals: report.proposals,
                at_ms: self.clock.epoch_ms(),
            })?;
            // Proposals changed the backlog; fold them in now.
            self.sync_mirror()?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Persistence and status
    // -------------------------------------------------------------------

    /// Commit with one retry; a second failure halts the engine. Visible
    /// failure over silent success.
    fn commit(&mut self, event: Event) -> Result<u64, EngineError> {
        match self.store.commit(event.clone()) {
            Ok(seq) => Ok(seq),
            Err(first) => {
                warn!(error = %first, "state store write failed; retrying once");
                match self.store.commit(event) {
                    Ok(seq) => Ok(seq),
                    Err(second) => {
                        let reason = format!("state store write failure: {second}");
                        error!(error = %second, "state store write failed twice; halting");
                        Err(EngineError::Halted(reason))
                    }
                }
            }
        }
    }

    fn checkpoint(&mut self) -> Result<(), EngineError> {
        let mut counters = self.store.with_state(|s| s.counters);
        counters.total_iterations = self.iteration;
        self.commit(Event::Checkpoint { counters })?;
        Ok(())
    }

    fn build_status(&self, degraded: bool) -> StatusSnapshot {
        self.store.with_state(|state| StatusSnapshot {
            uptime_ms: self.started.elapsed().as_millis() as u64,
            paused: state.paused,
            halted: state.halted.clone(),
            iteration: self.iteration,
            state_version: self.store.version(),
            degraded,
            slots: state.slots.values().map(SlotEntry::from).collect(),
            phases: state.phase_counts(),
            counters: state.counters,
        })
    }

    fn publish_status(&mut self) {
        let status = self.build_status(false);
        self.bus.publish_state(
            serde_json::json!({
                "version": status.state_version,
                "iteration": status.iteration,
                "paused": status.paused,
            }),
            self.clock.epoch_ms(),
        );
        let _ = self.status_tx.send_replace(status);
    }

    // -------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------

    /// Final drain: settle in-flight attempts within the grace window,
    /// then persist a snapshot.
    async fn drain_and_persist(&mut self) {
        if !self.pool.all_idle() {
            self.pool.shutdown();
            let grace = Duration::from_secs(self.config.daemon.interrupt_grace_seconds);
            let deadline = tokio::time::Instant::now() + grace;
            while !self.pool.all_idle() && tokio::time::Instant::now() < deadline {
                let next = tokio::time::timeout_at(deadline, self.pool.events_rx.recv()).await;
                match next {
                    Ok(Some(event)) => {
                        self.pending_events.push(event);
                        if let Err(e) = self.apply_slot_events().await {
                            warn!(error = %e, "error applying events during drain");
                            break;
                        }
                    }
                    _ => break,
                }
            }
            // Busy flags clear just after the final events; settle them.
            self.pool.drain(Duration::from_millis(500)).await;
        }
        self.publish_status();
        if let Err(e) = self.store.write_snapshot() {
            warn!(error = %e, "final snapshot failed");
        }
    }
}

#[cfg(test)]
#[path = "runloop_tests.rs"]
mod tests;
