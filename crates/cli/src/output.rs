// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering for control responses.

use gf_wire::{IssueDetail, IssueSummary, StatusSnapshot};

pub(crate) fn print_status(status: &StatusSnapshot) {
    let state = if status.halted.is_some() {
        "halted"
    } else if status.paused {
        "paused"
    } else {
        "running"
    };
    let degraded = if status.degraded { " (degraded snapshot)" } else { "" };
    println!(
        "{state}{degraded}  uptime {}s  iteration {}  version {}",
        status.uptime_ms / 1000,
        status.iteration,
        status.state_version
    );
    if let Some(ref reason) = status.halted {
        println!("halt reason: {reason}");
    }

    println!(
        "completed {}  failed attempts {}  batches {}",
        status.counters.successful_completions,
        status.counters.failed_attempts,
        status.counters.next_batch_id
    );

    for slot in &status.slots {
        match &slot.issue {
            Some(issue) => println!("  slot {}: {} {}", slot.id, slot.state, issue),
            None => println!("  slot {}: {}", slot.id, slot.state),
        }
    }
    if !status.phases.is_empty() {
        let phases: Vec<String> =
            status.phases.iter().map(|(phase, n)| format!("{phase}={n}")).collect();
        println!("issues: {}", phases.join(" "));
    }
}

pub(crate) fn print_issues(issues: &[IssueSummary]) {
    if issues.is_empty() {
        println!("no issues");
        return;
    }
    println!("{:<12} {:<13} {:>3} {:>4}  {}", "id", "phase", "pri", "try", "title");
    for issue in issues {
        println!(
            "{:<12} {:<13} {:>3} {:>4}  {}",
            issue.id, issue.phase, issue.priority, issue.attempts, issue.title
        );
    }
}

pub(crate) fn print_issue(issue: &IssueDetail) {
    println!("{}  {}", issue.summary.id, issue.summary.title);
    println!("phase {}  status {}  priority {}", issue.summary.phase, issue.status, issue.summary.priority);
    if let Some(ref error) = issue.summary.last_error {
        println!("last error: {error}");
    }
    if !issue.deps.is_empty() {
        println!("blocked by: {}", issue.deps.join(", "));
    }
    if let Some(ref workspace) = issue.workspace {
        println!("workspace: {workspace}");
    }
    if !issue.description.is_empty() {
        println!("\n{}", issue.description);
    }
    if !issue.acceptance_criteria.is_empty() {
        println!("\nacceptance:\n{}", issue.acceptance_criteria);
    }
    if !issue.attempts.is_empty() {
        println!("\nattempts:");
        for attempt in &issue.attempts {
            let outcome = attempt.outcome.as_deref().unwrap_or("live");
            println!("  #{} [{}] {} ({})", attempt.seq, attempt.tier, outcome, attempt.session);
            if let Some(ref feedback) = attempt.feedback {
                for line in feedback.lines().take(4) {
                    println!("      {line}");
                }
            }
        }
    }
}
