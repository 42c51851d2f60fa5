// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer: autonomous agent orchestrator CLI.

mod client;
mod commands;
mod exit_error;
mod output;

use clap::{Args, Parser, Subcommand};
use exit_error::ExitError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "gaffer", version, about = "Autonomous agent orchestrator")]
struct Cli {
    /// Config file path.
    #[arg(long, global = true, default_value = "gaffer.toml")]
    config: PathBuf,

    /// Verbose logging (debug level).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct RunArgs {
    /// Stop after this many loop iterations.
    #[arg(long)]
    pub(crate) max_iterations: Option<u64>,

    /// Work only on the given issue id.
    #[arg(long)]
    pub(crate) issue: Option<String>,

    /// Mirror and schedule, but never dispatch agents.
    #[arg(long)]
    pub(crate) dry_run: bool,

    /// Disable the planner pass.
    #[arg(long)]
    pub(crate) no_planner: bool,

    /// Planner pass cadence in loop iterations.
    #[arg(long)]
    pub(crate) planner_interval: Option<u64>,

    /// Disable the quality pass.
    #[arg(long)]
    pub(crate) no_quality: bool,

    /// Quality pass cadence in loop iterations.
    #[arg(long)]
    pub(crate) quality_interval: Option<u64>,

    /// Agent wall timeout override, seconds.
    #[arg(long)]
    pub(crate) agent_timeout: Option<u64>,

    /// Dashboard port (0 disables).
    #[arg(long)]
    pub(crate) port: Option<u16>,

    /// Reinitialize a corrupt state store instead of refusing to start.
    #[arg(long)]
    pub(crate) force: bool,

    /// Dispatch issues even when their blockers are not completed.
    #[arg(long)]
    pub(crate) skip_deps: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run the engine (default).
    Run(RunArgs),

    /// Write a starter config and state directory.
    Init {
        /// Overwrite an existing config.
        #[arg(long)]
        force: bool,
    },

    /// Serve the dashboard over an existing state directory (no engine).
    Serve {
        #[arg(long, default_value_t = 8334)]
        port: u16,
    },

    /// Check config, tracker, VCS, and engine liveness.
    Doctor,

    /// Refresh the tracker mirror and print backlog counts.
    Sync,

    /// Engine status snapshot.
    Status,

    /// Suspend dispatch (in-flight work completes).
    Pause,

    /// Resume dispatch.
    Resume,

    /// Cancel all busy slots.
    Interrupt,

    /// File a new issue.
    File {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        priority: Option<u32>,
        #[arg(long = "label")]
        labels: Vec<String>,
    },

    /// Comment on an issue.
    Comment {
        id: String,
        body: String,
        #[arg(long, default_value = "operator")]
        author: String,
    },

    /// Update issue fields (empty string clears a field).
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        acceptance: Option<String>,
        #[arg(long)]
        priority: Option<u32>,
        /// open | in_progress | closed
        #[arg(long)]
        status: Option<String>,
    },

    /// Full engine record for one issue.
    Inspect { id: String },

    /// List issues, optionally by phase.
    List {
        #[arg(long)]
        phase: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = dispatch(cli).await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code.clamp(0, 255) as u8)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<(), ExitError> {
    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));
    match command {
        Command::Run(args) => commands::run::run(&cli.config, cli.verbose, args).await,
        Command::Init { force } => commands::init::run(&cli.config, force),
        Command::Serve { port } => commands::run::serve(&cli.config, cli.verbose, port).await,
        Command::Doctor => commands::doctor::run(&cli.config).await,
        Command::Sync => commands::sync::run(&cli.config).await,
        other => commands::ctl::run(&cli.config, other).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
