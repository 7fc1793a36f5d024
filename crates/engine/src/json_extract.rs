// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pulls the trailing structured-output object out of an agent's raw text:
//! a fenced ```json block, a fenced plain block, or a bare trailing object.
//! The last one that parses wins (spec.md §4.5).

use coven_core::Value;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Converts a parsed JSON value into the render-context [`Value`] agent step
/// outputs and `step_outputs` are stored as.
pub fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        JsonValue::Object(map) => {
            let mut m = IndexMap::new();
            for (k, v) in map {
                m.insert(k.clone(), json_to_value(v));
            }
            Value::Map(m)
        }
    }
}

fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        let after_fence = &rest[start + 3..];
        let after_lang = after_fence
            .find('\n')
            .map(|i| &after_fence[i + 1..])
            .unwrap_or(after_fence);
        if let Some(end) = after_lang.find("```") {
            blocks.push(after_lang[..end].trim());
            rest = &after_lang[end + 3..];
        } else {
            break;
        }
    }
    blocks
}

/// Scans a block of text for a trailing bare `{ ... }` object by matching
/// braces from the last `{` found.
fn trailing_object(text: &str) -> Option<&str> {
    let trimmed = text.trim_end();
    let start = trimmed.rfind('{')?;
    let candidate = &trimmed[start..];
    // Only accept it if the candidate runs to the end of the text (modulo
    // trailing whitespace already trimmed) and is balanced.
    let mut depth = 0i32;
    for ch in candidate.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    if depth == 0 {
        Some(candidate)
    } else {
        None
    }
}

/// Finds the last valid JSON object in `text`, trying fenced blocks
/// (most recent first) before a bare trailing object.
pub fn extract_last_json_object(text: &str) -> Option<JsonValue> {
    for block in fenced_blocks(text).into_iter().rev() {
        if let Ok(v @ JsonValue::Object(_)) = serde_json::from_str(block) {
            return Some(v);
        }
    }
    let candidate = trailing_object(text)?;
    match serde_json::from_str(candidate) {
        Ok(v @ JsonValue::Object(_)) => Some(v),
        _ => None,
    }
}
