// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The render-context value type shared by the template engine, workflow state,
//! and agent output parsing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value inside a render context: strings, numbers, booleans, ordered lists,
/// or nested mappings, per the spec's render-context data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn map() -> Self {
        Value::Map(IndexMap::new())
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    /// Strict boolean extraction. Only `Value::Bool` is valid; every other
    /// variant is a type-mismatch, per the spec's "non-boolean fails the step" rule.
    pub fn as_strict_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Resolve a dotted path (`a.b.c`) against this value, treating `self` as the root.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Map(m) => m.get(segment)?,
                Value::List(l) => l.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn set_path(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, init)) = segments.split_last() else {
            return;
        };
        let mut current = self;
        for segment in init {
            let map = match current {
                Value::Map(m) => m,
                _ => {
                    *current = Value::map();
                    match current {
                        Value::Map(m) => m,
                        _ => unreachable!(),
                    }
                }
            };
            current = map.entry(segment.to_string()).or_insert_with(Value::map);
        }
        if let Value::Map(m) = current {
            m.insert(last.to_string(), value);
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                let joined: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", joined.join(", "))
            }
            Value::Map(_) => write!(f, "{}", serde_json::to_string(self).unwrap_or_default()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
