// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spell: a prompt template rendered against a context and sent to an agent.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSource {
    Builtin,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    pub content: String,
    pub source: SpellSource,
}

/// A spell reference is inline source if it contains a newline, otherwise a bare name.
pub fn is_inline_spell(reference: &str) -> bool {
    reference.contains('\n')
}
