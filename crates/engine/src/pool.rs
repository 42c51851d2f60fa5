// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed worker slot table.
//!
//! Each slot runs a small driver task that executes the per-issue
//! pipeline. Drivers never touch the state store; they emit intents as
//! `(slot, event)` pairs that the loop applies. Dispatch and cancellation
//! travel over bounded channels.

use crate::pipeline::{self, AttemptReport, PipelineDeps};
use gf_core::{AgentSignal, Clock, IssueId, ModelTier, Phase, SlotId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Everything a driver needs to run one attempt.
#[derive(Debug, Clone)]
pub struct DispatchOrder {
    pub issue_id: IssueId,
    pub seq: u32,
    pub tier: ModelTier,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: String,
    /// Declared file manifest; empty means unrestricted.
    pub manifest: Vec<String>,
    /// Reviewer feedback / test output carried from the previous attempt.
    pub feedback: Option<String>,
    /// Set after a timeout: ask the agent for a smaller bite.
    pub reduced_scope: bool,
    /// Set after a manifest violation: stricter prompt.
    pub strict_manifest: bool,
}

/// Intents a slot driver reports to the loop.
#[derive(Debug)]
pub enum SlotEvent {
    /// Pipeline progress (implementing → reviewing → merging).
    Phase { issue: IssueId, phase: Phase },
    /// Context-expansion request from the agent stream.
    Signal { issue: IssueId, signal: AgentSignal },
    /// The pipeline exited; the attempt is finished.
    Finished { issue: IssueId, seq: u32, report: AttemptReport },
}

struct SlotHandle {
    order_tx: mpsc::Sender<(DispatchOrder, CancellationToken)>,
    cancel: parking_lot::Mutex<CancellationToken>,
    busy: Arc<AtomicBool>,
}

/// The fixed slot table. Slot count never changes at runtime.
pub struct WorkerPool {
    slots: Vec<SlotHandle>,
    /// Completion/progress events from all drivers, consumed by the loop.
    pub events_rx: mpsc::Receiver<(SlotId, SlotEvent)>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new<C: Clock>(num_workers: u32, deps: Arc<PipelineDeps<C>>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(num_workers as usize * 8 + 16);
        let shutdown = CancellationToken::new();
        let mut slots = Vec::with_capacity(num_workers as usize);

        for index in 0..num_workers {
            let id = SlotId(index);
            let (order_tx, order_rx) = mpsc::channel(1);
            let busy = Arc::new(AtomicBool::new(false));
            tokio::spawn(drive_slot(
                id,
                Arc::clone(&deps),
                order_rx,
                events_tx.clone(),
                Arc::clone(&busy),
                shutdown.child_token(),
            ));
            slots.push(SlotHandle {
                order_tx,
                cancel: parking_lot::Mutex::new(CancellationToken::new()),
                busy,
            });
        }

        Self { slots, events_rx, shutdown }
    }

    /// Hand an order to an idle slot. Returns false when the slot is busy
    /// (the loop's view was stale) or gone.
    pub fn try_dispatch(&self, slot: SlotId, order: DispatchOrder) -> bool {
        let Some(handle) = self.slots.get(slot.0 as usize) else { return false };
        if handle.busy.load(Ordering::SeqCst) {
            return false;
        }
        let token = self.shutdown.child_token();
        *handle.cancel.lock() = token.clone();
        match handle.order_tx.try_send((order, token)) {
            Ok(()) => true,
            Err(e) => {
                warn!(slot = %slot, error = %e, "dispatch refused");
                false
            }
        }
    }

    pub fn is_idle(&self, slot: SlotId) -> bool {
        self.slots
            .get(slot.0 as usize)
            .map(|handle| !handle.busy.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn all_idle(&self) -> bool {
        self.slots.iter().all(|handle| !handle.busy.load(Ordering::SeqCst))
    }

    /// Cancel the attempt running on one slot.
    pub fn cancel(&self, slot: SlotId) {
        if let Some(handle) = self.slots.get(slot.0 as usize) {
            handle.cancel.lock().cancel();
        }
    }

    /// Cancel every busy slot (interrupt).
    pub fn cancel_all(&self) {
        for handle in &self.slots {
            if handle.busy.load(Ordering::SeqCst) {
                handle.cancel.lock().cancel();
            }
        }
    }

    /// Wait (bounded) for every driver to settle idle.
    pub async fn drain(&self, timeout: std::time::Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.all_idle() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        true
    }

    /// Stop accepting work and cancel in-flight attempts.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// One slot's driver: wait for an order, run the pipeline, report.
async fn drive_slot<C: Clock>(
    slot: SlotId,
    deps: Arc<PipelineDeps<C>>,
    mut order_rx: mpsc::Receiver<(DispatchOrder, CancellationToken)>,
    events_tx: mpsc::Sender<(SlotId, SlotEvent)>,
    busy: Arc<AtomicBool>,
    shutdown: CancellationToken,
) {
    loop {
        let (order, cancel) = tokio::select! {
            _ = shutdown.cancelled() => break,
            order = order_rx.recv() => match order {
                Some(pair) => pair,
                None => break,
            },
        };

        busy.store(true, Ordering::SeqCst);
        let issue = order.issue_id.clone();
        let seq = order.seq;
        debug!(slot = %slot, issue = %issue, seq, "attempt starting");

        let report = pipeline::run_attempt(&deps, slot, &order, &cancel, &events_tx).await;

        let _ = events_tx.send((slot, SlotEvent::Finished { issue, seq, report })).await;
        busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
