// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: agent process supervision, question
//! classification, and desktop/log notification.

pub mod agent;
pub mod notify;
pub mod question;
pub mod subprocess;

pub use agent::{
    extract_binary_name, AgentAdapter, AgentError, AgentHandle, AgentOutcome, AgentSpawnConfig,
    ProcessAgentAdapter,
};
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter};
pub use question::{classify, QuestionClassification};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use agent::{AgentCall, FakeAgentAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
