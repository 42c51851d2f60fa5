// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub(crate) mod ctl;
pub(crate) mod doctor;
pub(crate) mod init;
pub(crate) mod run;
pub(crate) mod sync;

use crate::exit_error::ExitError;
use gf_core::Config;
use std::path::Path;

/// Load and validate the config file, mapping failures to exit code 1.
pub(crate) fn load_config(path: &Path) -> Result<Config, ExitError> {
    Config::load(path).map_err(|e| ExitError::engine(e.to_string()))
}
