// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.
//!
//! Codes: 1 engine error, 2 invalid request, 3 engine not running.

use std::fmt;

pub const EXIT_ENGINE_ERROR: i32 = 1;
pub const EXIT_INVALID_REQUEST: i32 = 2;
pub const EXIT_NOT_RUNNING: i32 = 3;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::new(EXIT_ENGINE_ERROR, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_REQUEST, message)
    }

    pub fn not_running(message: impl Into<String>) -> Self {
        Self::new(EXIT_NOT_RUNNING, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<anyhow::Error> for ExitError {
    fn from(e: anyhow::Error) -> Self {
        Self::engine(format!("{e:#}"))
    }
}
