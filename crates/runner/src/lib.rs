// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gf-runner: agent subprocess runner.
//!
//! Spawns a subprocess and exposes its stdout as a stream of line events,
//! terminated by a single synthetic exit event. Two independent timeouts
//! (idle and wall) and caller cancellation all take the same kill path:
//! SIGTERM, a grace window, then SIGKILL. Stderr is captured separately as
//! a bounded tail attached to the exit event.

mod split;
mod tail;

pub use split::split_command;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tail::StderrTail;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Maximum stderr retained and attached to the exit event.
pub const STDERR_TAIL_BYTES: usize = 16 * 1024;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("empty command line")]
    EmptyArgv,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a run spec's subprocess should be launched and bounded.
#[derive(Debug, Clone)]
pub struct RunnerSpec {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    /// Kill the child when it produces no output for this long.
    pub idle_timeout: Duration,
    /// Kill the child when it runs longer than this in total.
    pub wall_timeout: Duration,
    /// SIGTERM-to-SIGKILL grace window.
    pub grace: Duration,
}

impl RunnerSpec {
    pub fn new(argv: Vec<String>, cwd: PathBuf) -> Self {
        Self {
            argv,
            cwd,
            env: Vec::new(),
            idle_timeout: Duration::from_secs(300),
            wall_timeout: Duration::from_secs(1800),
            grace: Duration::from_secs(5),
        }
    }
}

/// Why the event stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Child exited on its own.
    Natural,
    /// No output for the idle window.
    IdleTimeout,
    /// Total runtime exceeded the wall window.
    WallTimeout,
    /// The caller cancelled the run. Indistinguishable from a timeout at
    /// the child level, classified distinctly here.
    Cancelled,
}

impl ExitReason {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExitReason::IdleTimeout | ExitReason::WallTimeout)
    }
}

gf_core::simple_display! {
    ExitReason {
        Natural => "natural",
        IdleTimeout => "idle_timeout",
        WallTimeout => "wall_timeout",
        Cancelled => "cancelled",
    }
}

/// Final synthetic event of every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    pub reason: ExitReason,
    /// Process exit code; `None` when the child died to a signal.
    pub code: Option<i32>,
    /// Whether the grace window expired and SIGKILL was needed.
    pub force_killed: bool,
    /// Last [`STDERR_TAIL_BYTES`] of stderr.
    pub stderr_tail: String,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.reason == ExitReason::Natural && self.code == Some(0)
    }
}

/// Events yielded by a run: stdout lines, then exactly one `Exit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Line(String),
    Exit(ExitStatus),
}

/// Spawn the subprocess and stream its events.
///
/// The returned receiver yields `Line` events and terminates after a single
/// `Exit` event. Dropping the receiver abandons the pump; the child is
/// still reaped (kill-on-drop).
pub fn spawn(
    spec: RunnerSpec,
    cancel: CancellationToken,
) -> Result<mpsc::Receiver<RunnerEvent>, RunnerError> {
    let program = spec.argv.first().ok_or(RunnerError::EmptyArgv)?.clone();

    let mut command = Command::new(&program);
    command
        .args(&spec.argv[1..])
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .map_err(|source| RunnerError::Spawn { program: program.clone(), source })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(pump(spec, program, child, stdout, stderr, cancel, tx));
    Ok(rx)
}

/// Outcome of one wait-for-next-line step.
enum Step {
    Line(String),
    Eof,
    Stop(ExitReason),
}

async fn pump(
    spec: RunnerSpec,
    program: String,
    mut child: Child,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    cancel: CancellationToken,
    tx: mpsc::Sender<RunnerEvent>,
) {
    let stderr_task = tokio::spawn(async move {
        let mut tail = StderrTail::new(STDERR_TAIL_BYTES);
        if let Some(mut stderr) = stderr {
            let mut buf = [0u8; 4096];
            while let Ok(n) = stderr.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                tail.push(&buf[..n]);
            }
        }
        tail.into_string()
    });

    let wall_deadline = tokio::time::Instant::now() + spec.wall_timeout;
    let mut lines = match stdout {
        Some(stdout) => Some(BufReader::new(stdout).lines()),
        None => None,
    };

    let outcome = loop {
        let Some(ref mut lines) = lines else { break Step::Eof };
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Stop(ExitReason::Cancelled),
            _ = tokio::time::sleep_until(wall_deadline) => Step::Stop(ExitReason::WallTimeout),
            line = tokio::time::timeout(spec.idle_timeout, lines.next_line()) => match line {
                Err(_) => Step::Stop(ExitReason::IdleTimeout),
                Ok(Ok(Some(line))) => Step::Line(line),
                Ok(Ok(None)) => Step::Eof,
                Ok(Err(e)) => {
                    debug!(program = %program, error = %e, "stdout read error");
                    Step::Eof
                }
            },
        };
        match step {
            Step::Line(line) => {
                if tx.send(RunnerEvent::Line(line)).await.is_err() {
                    // Receiver gone; treat like cancellation.
                    break Step::Stop(ExitReason::Cancelled);
                }
            }
            other => break other,
        }
    };

    let (reason, code, force_killed) = match outcome {
        Step::Eof => {
            // Stdout closed; the child is exiting (or has exited) on its own.
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(program = %program, error = %e, "wait failed");
                    None
                }
            };
            (ExitReason::Natural, code, false)
        }
        Step::Stop(reason) => {
            let (code, force_killed) = terminate(&mut child, spec.grace).await;
            (reason, code, force_killed)
        }
        Step::Line(_) => unreachable!("lines are consumed in the loop"),
    };

    let stderr_tail = stderr_task.await.unwrap_or_default();
    debug!(
        program = %program,
        reason = %reason,
        code = ?code,
        force_killed,
        "runner exit"
    );
    let _ = tx
        .send(RunnerEvent::Exit(ExitStatus { reason, code, force_killed, stderr_tail }))
        .await;
}

/// SIGTERM, wait out the grace window, then SIGKILL.
async fn terminate(child: &mut Child, grace: Duration) -> (Option<i32>, bool) {
    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(_)) => (None, false),
        Err(_) => {
            let _ = child.kill().await;
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(_) => None,
            };
            (code, true)
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
