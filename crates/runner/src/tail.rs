// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded stderr tail buffer.

use std::collections::VecDeque;

/// Keeps the last `limit` bytes pushed into it.
pub(crate) struct StderrTail {
    buf: VecDeque<u8>,
    limit: usize,
}

impl StderrTail {
    pub(crate) fn new(limit: usize) -> Self {
        Self { buf: VecDeque::with_capacity(limit.min(4096)), limit }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) {
        if bytes.len() >= self.limit {
            self.buf.clear();
            self.buf.extend(&bytes[bytes.len() - self.limit..]);
            return;
        }
        let overflow = (self.buf.len() + bytes.len()).saturating_sub(self.limit);
        self.buf.drain(..overflow);
        self.buf.extend(bytes);
    }

    pub(crate) fn into_string(self) -> String {
        String::from_utf8_lossy(&Vec::from(self.buf)).into_owned()
    }
}
