// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared subprocess invocation for the CLI-backed adapters.

use std::path::Path;
use std::process::Output;

/// Captured result of one adapter CLI invocation.
pub(crate) struct CmdOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Case-insensitive search across both output streams.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.stdout.to_ascii_lowercase().contains(&needle)
            || self.stderr.to_ascii_lowercase().contains(&needle)
    }
}

fn into_cmd_output(output: Output) -> CmdOutput {
    CmdOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Run `bin args...` in `cwd` and capture its output.
pub(crate) async fn run(bin: &str, args: &[&str], cwd: &Path) -> std::io::Result<CmdOutput> {
    let output = tokio::process::Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .stdin(std::process::Stdio::null())
        .output()
        .await?;
    Ok(into_cmd_output(output))
}
