// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-issue pipeline: implement → manifest check → review → merge.
//!
//! Runs inside a slot driver. All state mutations happen loop-side from
//! the events this module emits; here we only drive subprocesses and the
//! VCS and produce an [`AttemptReport`].

use crate::bus::EventBus;
use crate::classify;
use crate::pool::{DispatchOrder, SlotEvent};
use gf_adapters::VcsGateway;
use gf_core::{
    AgentSignal, AgentsConfig, Clock, IssueId, ModelTier, Outcome, Phase, ProjectConfig,
    RetryConfig, SessionId, SignalParser, SlotId, TranscriptEvent, TranscriptEventKind,
};
use gf_runner::{ExitStatus, RunnerEvent, RunnerSpec};
use gf_storage::{TranscriptStore, TranscriptWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Kept stdout tail used for failure classification and test feedback.
const TAIL_LIMIT: usize = 4 * 1024;

/// Shared dependencies for all slot drivers.
pub struct PipelineDeps<C: Clock> {
    pub vcs: Arc<dyn VcsGateway>,
    pub transcripts: TranscriptStore,
    pub bus: Arc<EventBus>,
    pub clock: C,
    pub agents: AgentsConfig,
    pub retry: RetryConfig,
    pub project: ProjectConfig,
}

/// Result of one pipeline run; the loop classifies it into the state
/// machine via the decision module.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    pub outcome: Outcome,
    /// Reviewer feedback, test output, or violation detail for the next
    /// attempt.
    pub feedback: Option<String>,
    /// Paths outside the manifest (manifest violations only).
    pub offending_paths: Vec<String>,
}

impl AttemptReport {
    fn of(outcome: Outcome) -> Self {
        Self { outcome, feedback: None, offending_paths: Vec::new() }
    }

    fn with_feedback(outcome: Outcome, feedback: impl Into<String>) -> Self {
        Self { outcome, feedback: Some(feedback.into()), offending_paths: Vec::new() }
    }
}

enum Role {
    Implementer,
    Reviewer,
}

impl Role {
    fn name(&self) -> &'static str {
        match self {
            Role::Implementer => "implementer",
            Role::Reviewer => "reviewer",
        }
    }
}

/// Everything observed from one agent run.
struct AgentRun {
    exit: ExitStatus,
    ready: bool,
    verdict: Option<AgentSignal>,
    error_kind: Option<String>,
    tail: String,
}

/// Run one attempt end to end.
pub async fn run_attempt<C: Clock>(
    deps: &PipelineDeps<C>,
    slot: SlotId,
    order: &DispatchOrder,
    cancel: &CancellationToken,
    events: &mpsc::Sender<(SlotId, SlotEvent)>,
) -> AttemptReport {
    let issue = &order.issue_id;
    let session = SessionId::new(issue, order.seq);

    let workspace = match deps.vcs.create_workspace(slot).await {
        Ok(path) => path,
        Err(e) => {
            warn!(issue = %issue, error = %e, "workspace creation failed");
            return AttemptReport::with_feedback(Outcome::WorkspaceCreationFailed, e.to_string());
        }
    };

    let mut writer = match deps.transcripts.writer(&session) {
        Ok(writer) => Some(writer),
        Err(e) => {
            warn!(session = %session, error = %e, "transcript unavailable for this attempt");
            None
        }
    };

    // -- implement --
    send_phase(events, slot, issue, Phase::Implementing).await;
    let run = match run_agent(
        deps,
        Role::Implementer,
        order,
        &workspace,
        &session,
        writer.as_mut(),
        cancel,
        events,
        slot,
    )
    .await
    {
        Ok(run) => run,
        Err(report) => return report,
    };

    if let Some(outcome) =
        classify::classify_implementer(&run.exit, run.ready, run.error_kind.as_deref(), &run.tail)
    {
        return finish_failed(outcome, &run);
    }

    // -- manifest check --
    if !order.manifest.is_empty() {
        match deps.vcs.diff_summary(&workspace).await {
            Ok(diff) => {
                let offenders = diff.outside_manifest(&order.manifest);
                if !offenders.is_empty() {
                    if let Err(e) = deps.vcs.restore_paths(&workspace, &offenders).await {
                        warn!(issue = %issue, error = %e, "manifest rollback failed");
                    }
                    return AttemptReport {
                        outcome: Outcome::ManifestViolation,
                        feedback: Some(format!(
                            "diff touched files outside the declared manifest: {}",
                            offenders.join(", ")
                        )),
                        offending_paths: offenders,
                    };
                }
            }
            Err(e) => {
                return AttemptReport::with_feedback(Outcome::TransientFailure, e.to_string());
            }
        }
    }

    // -- review --
    send_phase(events, slot, issue, Phase::Reviewing).await;
    let review = match run_agent(
        deps,
        Role::Reviewer,
        order,
        &workspace,
        &session,
        writer.as_mut(),
        cancel,
        events,
        slot,
    )
    .await
    {
        Ok(run) => run,
        Err(report) => return report,
    };

    match review_outcome(&review) {
        ReviewOutcome::Approved => {}
        ReviewOutcome::ChangesRequested(feedback) => {
            return AttemptReport::with_feedback(Outcome::ReviewRejected, feedback);
        }
        ReviewOutcome::Failed(outcome) => return finish_failed(outcome, &review),
    }

    // -- merge --
    send_phase(events, slot, issue, Phase::Merging).await;
    let message = format!("{}: {} (attempt {})", issue, order.title, order.seq);
    if let Err(e) = deps.vcs.commit(&workspace, &message).await {
        return AttemptReport::with_feedback(Outcome::TransientFailure, e.to_string());
    }
    match deps.vcs.squash_into_main(&workspace).await {
        Err(e) => AttemptReport::with_feedback(Outcome::TransientFailure, e.to_string()),
        Ok(merge) if merge.conflict => AttemptReport::of(Outcome::MergeConflict),
        Ok(merge) if !merge.ok => {
            AttemptReport::with_feedback(Outcome::TransientFailure, "squash into main failed")
        }
        Ok(_) => AttemptReport::of(Outcome::Success),
    }
}

enum ReviewOutcome {
    Approved,
    ChangesRequested(String),
    Failed(Outcome),
}

/// Map a reviewer run onto its contract: exactly one of APPROVED or
/// CHANGES_REQUESTED before exit 0; any other termination is a crash.
fn review_outcome(run: &AgentRun) -> ReviewOutcome {
    use gf_runner::ExitReason;
    match run.exit.reason {
        ExitReason::Cancelled => return ReviewOutcome::Failed(Outcome::UserInterrupt),
        ExitReason::IdleTimeout | ExitReason::WallTimeout => {
            return ReviewOutcome::Failed(Outcome::Timeout)
        }
        ExitReason::Natural => {}
    }
    if !run.exit.success() {
        return ReviewOutcome::Failed(Outcome::Crash);
    }
    match &run.verdict {
        Some(AgentSignal::Approved) => ReviewOutcome::Approved,
        Some(AgentSignal::ChangesRequested { feedback }) => {
            ReviewOutcome::ChangesRequested(feedback.clone())
        }
        _ => ReviewOutcome::Failed(Outcome::Crash),
    }
}

/// Attach useful context to a failed attempt.
fn finish_failed(outcome: Outcome, run: &AgentRun) -> AttemptReport {
    let feedback = match outcome {
        Outcome::TestFailure => Some(test_feedback(run)),
        _ if !run.exit.stderr_tail.is_empty() => Some(run.exit.stderr_tail.clone()),
        _ => None,
    };
    AttemptReport { outcome, feedback, offending_paths: Vec::new() }
}

/// Test output appended to the next attempt's prompt context.
fn test_feedback(run: &AgentRun) -> String {
    let mut feedback = String::from("test output from the previous attempt:\n");
    feedback.push_str(&run.tail);
    if !run.exit.stderr_tail.is_empty() {
        feedback.push('\n');
        feedback.push_str(&run.exit.stderr_tail);
    }
    feedback
}

async fn send_phase(
    events: &mpsc::Sender<(SlotId, SlotEvent)>,
    slot: SlotId,
    issue: &IssueId,
    phase: Phase,
) {
    let _ = events.send((slot, SlotEvent::Phase { issue: issue.clone(), phase })).await;
}

/// Spawn one agent and pump its stream: transcripts, bus fanout, signal
/// parsing. Returns the collected observations, or a ready-made report
/// when the process could not be spawned at all.
#[allow(clippy::too_many_arguments)]
async fn run_agent<C: Clock>(
    deps: &PipelineDeps<C>,
    role: Role,
    order: &DispatchOrder,
    workspace: &Path,
    session: &SessionId,
    mut writer: Option<&mut TranscriptWriter>,
    cancel: &CancellationToken,
    events: &mpsc::Sender<(SlotId, SlotEvent)>,
    slot: SlotId,
) -> Result<AgentRun, AttemptReport> {
    let command = match role {
        Role::Implementer => &deps.agents.implementer,
        Role::Reviewer => &deps.agents.reviewer,
    };
    let Some(argv) = gf_runner::split_command(command).filter(|argv| !argv.is_empty()) else {
        return Err(AttemptReport::with_feedback(
            Outcome::Crash,
            format!("unparsable {} command: {command:?}", role.name()),
        ));
    };

    let mut spec = RunnerSpec::new(argv, workspace.to_path_buf());
    spec.idle_timeout = Duration::from_secs(deps.agents.idle_timeout_seconds);
    spec.wall_timeout = Duration::from_secs(deps.agents.timeout_seconds);
    spec.grace = Duration::from_secs(deps.agents.grace_seconds);
    spec.env = agent_env(deps, &role, order);

    let mut rx = match gf_runner::spawn(spec, cancel.clone()) {
        Ok(rx) => rx,
        Err(e) => {
            return Err(AttemptReport::with_feedback(
                Outcome::Crash,
                format!("{} spawn failed: {e}", role.name()),
            ))
        }
    };

    let mut parser = SignalParser::new();
    let mut ready = false;
    let mut verdict = None;
    let mut error_kind = None;
    let mut tail = String::new();
    let mut transcript_seq = 0u64;

    let exit = loop {
        let Some(event) = rx.recv().await else {
            // Pump died without an exit event; treat as a crash below.
            break ExitStatus {
                reason: gf_runner::ExitReason::Natural,
                code: None,
                force_killed: false,
                stderr_tail: String::new(),
            };
        };
        match event {
            RunnerEvent::Line(line) => {
                push_tail(&mut tail, &line);
                if let Some((kind, _message)) = structured_error(&line) {
                    error_kind = Some(kind);
                }
                match parser.feed(&line) {
                    Some(AgentSignal::ReadyForReview) => ready = true,
                    Some(AgentSignal::Approved) => {
                        verdict = Some(AgentSignal::Approved);
                    }
                    Some(signal @ (AgentSignal::NeedFile { .. } | AgentSignal::NeedDoc { .. })) => {
                        let _ = events
                            .send((
                                slot,
                                SlotEvent::Signal {
                                    issue: order.issue_id.clone(),
                                    signal: signal.clone(),
                                },
                            ))
                            .await;
                    }
                    Some(other) => verdict = Some(other),
                    None => {}
                }
                transcript_seq += 1;
                record(
                    deps,
                    &mut writer,
                    session,
                    TranscriptEvent::classify_line(transcript_seq, deps.clock.epoch_ms(), &line),
                );
            }
            RunnerEvent::Exit(exit) => break exit,
        }
    };

    // A multiline CHANGES_REQUESTED block resolves at end of stream.
    if let Some(signal) = parser.finish() {
        verdict = Some(signal);
    }

    transcript_seq += 1;
    record(
        deps,
        &mut writer,
        session,
        TranscriptEvent {
            seq: transcript_seq,
            ts_ms: deps.clock.epoch_ms(),
            kind: TranscriptEventKind::Exit,
            payload: serde_json::json!({
                "role": role.name(),
                "reason": exit.reason.to_string(),
                "code": exit.code,
                "stderr_tail": exit.stderr_tail,
            }),
        },
    );
    debug!(
        session = %session,
        role = role.name(),
        reason = %exit.reason,
        code = ?exit.code,
        "agent exited"
    );

    Ok(AgentRun { exit, ready, verdict, error_kind, tail })
}

/// Environment handed to agent subprocesses; the prompt contract.
fn agent_env<C: Clock>(
    deps: &PipelineDeps<C>,
    role: &Role,
    order: &DispatchOrder,
) -> Vec<(String, String)> {
    let model = match order.tier {
        ModelTier::Default => deps.retry.default_model.clone(),
        ModelTier::Escalated => deps.retry.escalation_model.clone(),
    };
    let mut env = vec![
        ("GAFFER_ROLE".into(), role.name().to_string()),
        ("GAFFER_ISSUE_ID".into(), order.issue_id.as_str().to_string()),
        ("GAFFER_ISSUE_TITLE".into(), order.title.clone()),
        ("GAFFER_DESCRIPTION".into(), order.description.clone()),
        ("GAFFER_ACCEPTANCE".into(), order.acceptance_criteria.clone()),
        ("GAFFER_ATTEMPT".into(), order.seq.to_string()),
        ("GAFFER_MODEL".into(), model),
        ("GAFFER_BUILD_CMD".into(), deps.project.build_cmd.clone()),
        ("GAFFER_TEST_CMD".into(), deps.project.test_cmd.clone()),
    ];
    if !order.manifest.is_empty() {
        env.push(("GAFFER_MANIFEST".into(), order.manifest.join("\n")));
    }
    if let Some(ref feedback) = order.feedback {
        env.push(("GAFFER_FEEDBACK".into(), feedback.clone()));
    }
    if order.reduced_scope {
        env.push(("GAFFER_REDUCED_SCOPE".into(), "1".into()));
    }
    if order.strict_manifest {
        env.push(("GAFFER_STRICT_MANIFEST".into(), "1".into()));
    }
    env
}

/// `{type: "error", kind, message}` final line from the agent contract.
fn structured_error(line: &str) -> Option<(String, String)> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    if value.get("type")?.as_str()? != "error" {
        return None;
    }
    let kind = value.get("kind")?.as_str()?.to_string();
    let message = value.get("message").and_then(|m| m.as_str()).unwrap_or("").to_string();
    Some((kind, message))
}

fn push_tail(tail: &mut String, line: &str) {
    tail.push_str(line);
    tail.push('\n');
    if tail.len() > TAIL_LIMIT {
        let cut = tail.len() - TAIL_LIMIT;
        // Trim on a char boundary.
        let cut = (cut..tail.len()).find(|i| tail.is_char_boundary(*i)).unwrap_or(0);
        tail.drain(..cut);
    }
}

fn record<C: Clock>(
    deps: &PipelineDeps<C>,
    writer: &mut Option<&mut TranscriptWriter>,
    session: &SessionId,
    event: TranscriptEvent,
) {
    if let Some(writer) = writer.as_deref_mut() {
        if let Err(e) = writer.append(event.kind, event.payload.clone(), event.ts_ms) {
            warn!(session = %session, error = %e, "transcript append failed");
        }
    }
    deps.bus.publish_session(session, &event);
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
