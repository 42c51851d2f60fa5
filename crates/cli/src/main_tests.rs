// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::error::ErrorKind;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("gaffer").chain(args.iter().copied())).unwrap()
}

#[test]
fn bare_invocation_defaults_to_run() {
    let cli = parse(&[]);
    assert!(cli.command.is_none());
    assert_eq!(cli.config, PathBuf::from("gaffer.toml"));
}

#[test]
fn run_flags_parse() {
    let cli = parse(&[
        "run",
        "--max-iterations",
        "50",
        "--issue",
        "X-1",
        "--dry-run",
        "--no-planner",
        "--quality-interval",
        "400",
        "--agent-timeout",
        "600",
        "--port",
        "9000",
        "--skip-deps",
    ]);
    let Some(Command::Run(args)) = cli.command else { panic!("expected run") };
    assert_eq!(args.max_iterations, Some(50));
    assert_eq!(args.issue.as_deref(), Some("X-1"));
    assert!(args.dry_run);
    assert!(args.no_planner);
    assert_eq!(args.quality_interval, Some(400));
    assert_eq!(args.agent_timeout, Some(600));
    assert_eq!(args.port, Some(9000));
    assert!(args.skip_deps);
    assert!(!args.force);
}

#[test]
fn global_config_flag_works_after_subcommand() {
    let cli = parse(&["status", "--config", "/etc/gaffer.toml"]);
    assert_eq!(cli.config, PathBuf::from("/etc/gaffer.toml"));
    assert!(matches!(cli.command, Some(Command::Status)));
}

#[test]
fn file_collects_repeated_labels() {
    let cli = parse(&["file", "add retries", "--label", "planner", "--label", "infra"]);
    let Some(Command::File { title, labels, .. }) = cli.command else { panic!("expected file") };
    assert_eq!(title, "add retries");
    assert_eq!(labels, vec!["planner", "infra"]);
}

#[test]
fn update_accepts_empty_strings_to_clear() {
    let cli = parse(&["update", "X-1", "--description", ""]);
    let Some(Command::Update { description, .. }) = cli.command else { panic!("expected update") };
    assert_eq!(description.as_deref(), Some(""));
}

#[test]
fn comment_has_author_default() {
    let cli = parse(&["comment", "X-1", "looks stuck"]);
    let Some(Command::Comment { author, body, .. }) = cli.command else { panic!() };
    assert_eq!(author, "operator");
    assert_eq!(body, "looks stuck");
}

#[test]
fn unknown_subcommand_is_rejected() {
    let err = Cli::try_parse_from(["gaffer", "frobnicate"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
}

#[test]
fn serve_has_a_default_port() {
    let cli = parse(&["serve"]);
    let Some(Command::Serve { port }) = cli.command else { panic!() };
    assert_eq!(port, 8334);
}
