// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heuristic classifier that turns an agent's output lines into detected
//! questions, so the router can request a human answer.

use coven_core::QuestionType;
use regex::Regex;
use std::sync::LazyLock;

/// Result of scanning a block of recent agent output for a pending question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionClassification {
    pub kind: QuestionType,
    pub text: String,
    pub options: Option<Vec<String>>,
}

static NUMBERED_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\d+)[.)]\s+(.+)$").unwrap());
static YES_NO_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(y(es)?/n(o)?\)\s*$").unwrap());
static PERMISSION_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(allow|permit|grant) .*\?\s*$|may i\b.*\?\s*$").unwrap()
});

/// Classify the tail of an agent's output, returning `None` when nothing
/// resembling a pending question is present. Rules are tried in order; the
/// first match wins.
pub fn classify(recent_output: &str) -> Option<QuestionClassification> {
    let trimmed = recent_output.trim_end();
    if trimmed.is_empty() {
        return None;
    }

    let last_block = trimmed
        .rsplit("\n\n")
        .next()
        .unwrap_or(trimmed)
        .trim();

    if PERMISSION_PHRASE.is_match(last_block) {
        return Some(QuestionClassification {
            kind: QuestionType::Permission,
            text: last_block.to_string(),
            options: None,
        });
    }

    if YES_NO_SUFFIX.is_match(last_block) {
        return Some(QuestionClassification {
            kind: QuestionType::Confirmation,
            text: last_block.to_string(),
            options: Some(vec!["yes".into(), "no".into()]),
        });
    }

    let options: Vec<String> = NUMBERED_OPTION
        .captures_iter(last_block)
        .map(|c| c[2].trim().to_string())
        .collect();
    if options.len() >= 2 {
        let prompt_line = last_block
            .lines()
            .find(|l| !NUMBERED_OPTION.is_match(l))
            .unwrap_or(last_block);
        return Some(QuestionClassification {
            kind: QuestionType::Choice,
            text: prompt_line.trim().to_string(),
            options: Some(options),
        });
    }

    if last_block.ends_with('?') {
        return Some(QuestionClassification {
            kind: QuestionType::Input,
            text: last_block.to_string(),
            options: None,
        });
    }

    None
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
