// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations, one module per `covend` resource family —
//! mirrors `oj-cli::commands`'s one-module-per-entity layout, narrowed to
//! the resources `covend`'s HTTP API actually exposes.

pub mod agent;
pub mod daemon;
pub mod question;
pub mod session;
pub mod task;
pub mod workflow;

use serde_json::Value;

/// Pretty-prints a response body. The CLI is an interface-only front end
/// (spec.md §1 scopes it as an external collaborator), so it relays the
/// daemon's JSON rather than rendering `oj`'s colorized tables.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
