// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, ephemeral buffer of an agent step's output lines.
//!
//! Never durable (see `coven_core::agent_output`): evicted oldest-first once
//! the byte cap is hit, and dropped entirely when the step completes.

use coven_core::AgentOutputLine;
use std::collections::VecDeque;

/// Eviction cap, matching the spec's 10 MB ring buffer.
pub const MAX_BYTES: usize = 10 * 1024 * 1024;

pub struct RingBuffer {
    lines: VecDeque<AgentOutputLine>,
    bytes: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    pub fn new() -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
        }
    }

    pub fn push(&mut self, line: AgentOutputLine) {
        self.bytes += line.data.len();
        self.lines.push_back(line);
        while self.bytes > MAX_BYTES {
            match self.lines.pop_front() {
                Some(evicted) => self.bytes -= evicted.data.len(),
                None => break,
            }
        }
    }

    pub fn tail(&self) -> Vec<AgentOutputLine> {
        self.lines.iter().cloned().collect()
    }
}
