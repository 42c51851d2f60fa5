// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer doctor`: environment checks.

use crate::exit_error::ExitError;
use gf_core::Config;
use std::path::Path;

struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

fn check(name: &'static str, result: Result<String, String>) -> Check {
    match result {
        Ok(detail) => Check { name, ok: true, detail },
        Err(detail) => Check { name, ok: false, detail },
    }
}

async fn binary_runs(bin: &str) -> Result<String, String> {
    match tokio::process::Command::new(bin)
        .arg("--version")
        .stdin(std::process::Stdio::null())
        .output()
        .await
    {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout);
            Ok(version.lines().next().unwrap_or("present").to_string())
        }
        Err(e) => Err(format!("cannot run {bin}: {e}")),
    }
}

pub(crate) async fn run(config_path: &Path) -> Result<(), ExitError> {
    let mut checks = Vec::new();

    let config = match Config::load(config_path) {
        Ok(config) => {
            checks.push(check("config", Ok(format!("{} parses", config_path.display()))));
            Some(config)
        }
        Err(e) => {
            checks.push(check("config", Err(e.to_string())));
            None
        }
    };

    if let Some(ref config) = config {
        checks.push(check("tracker binary", binary_runs(&config.tracker.bin).await));
        checks.push(check("vcs binary", binary_runs(&config.vcs.bin).await));

        let records = config.tracker_records_path();
        checks.push(check(
            "tracker records",
            Ok(if records.exists() {
                records.display().to_string()
            } else {
                format!("{} missing; backlog is empty until the tracker writes it", records.display())
            }),
        ));

        let socket = config.socket_path();
        let alive = gf_daemon::lifecycle::ping(&socket).await;
        checks.push(check(
            "engine",
            if alive {
                Ok(format!("running ({})", socket.display()))
            } else {
                Ok("not running".to_string())
            },
        ));
    }

    let mut failed = false;
    for c in &checks {
        let mark = if c.ok { "ok " } else { "FAIL" };
        println!("[{mark}] {:<16} {}", c.name, c.detail);
        failed |= !c.ok;
    }
    if failed {
        Err(ExitError::engine("doctor found problems"))
    } else {
        Ok(())
    }
}
