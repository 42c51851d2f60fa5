// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer init`: starter config and state directory.

use crate::exit_error::ExitError;
use gf_core::Config;
use std::path::Path;

pub(crate) fn run(config_path: &Path, force: bool) -> Result<(), ExitError> {
    if config_path.exists() && !force {
        return Err(ExitError::invalid(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    // The config file's directory is the project root.
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.project.repo_root = parent.to_path_buf();
    }
    let text = toml::to_string_pretty(&config)
        .map_err(|e| ExitError::engine(format!("config render failed: {e}")))?;
    std::fs::write(config_path, text)
        .map_err(|e| ExitError::engine(format!("write failed: {e}")))?;
    std::fs::create_dir_all(config.state_dir())
        .map_err(|e| ExitError::engine(format!("state dir failed: {e}")))?;

    println!("wrote {}", config_path.display());
    println!("state directory: {}", config.state_dir().display());
    println!("edit [project], [agents], and [tracker] before the first run");
    Ok(())
}
