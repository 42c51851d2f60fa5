// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-generated identifiers.
//!
//! Issue ids are assigned by the external tracker and stay opaque strings
//! ([`crate::issue::IssueId`]). The only ids the engine mints itself are
//! control-command audit ids, formatted `cmd-{nanoid}`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Identifier for an accepted control command (audit history).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub String);

impl CommandId {
    pub const PREFIX: &'static str = "cmd-";

    /// Generate a new random id with the `cmd-` prefix.
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(12)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id suffix, without the `cmd-` prefix.
    pub fn suffix(&self) -> &str {
        self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommandId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for CommandId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
