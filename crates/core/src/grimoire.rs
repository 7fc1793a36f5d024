// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grimoire: a declarative workflow, an ordered list of steps applied to a task.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The action a finished step (or a policy hook) can request of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Continue,
    Fail,
    Block,
    ExitLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFail {
    Continue,
    Block,
    Fail,
}

impl From<OnFail> for StepAction {
    fn from(v: OnFail) -> Self {
        match v {
            OnFail::Continue => StepAction::Continue,
            OnFail::Block => StepAction::Block,
            OnFail::Fail => StepAction::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnSuccess {
    Continue,
    ExitLoop,
    Fail,
}

impl From<OnSuccess> for StepAction {
    fn from(v: OnSuccess) -> Self {
        match v {
            OnSuccess::Continue => StepAction::Continue,
            OnSuccess::ExitLoop => StepAction::ExitLoop,
            OnSuccess::Fail => StepAction::Fail,
        }
    }
}

fn default_timeout_duration() -> Option<Duration> {
    None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    /// Spell reference: a bare name (`implement`) or inline template source
    /// containing a newline.
    pub spell: String,
    #[serde(default)]
    pub input: IndexMap<String, String>,
    /// Output variable name; defaults to the step name if absent.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default = "default_timeout_duration", with = "duration_opt_secs")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptStep {
    pub command: String,
    #[serde(default = "default_on_fail")]
    pub on_fail: OnFail,
    #[serde(default = "default_on_success")]
    pub on_success: OnSuccess,
    #[serde(default = "default_timeout_duration", with = "duration_opt_secs")]
    pub timeout: Option<Duration>,
}

fn default_on_fail() -> OnFail {
    OnFail::Fail
}

fn default_on_success() -> OnSuccess {
    OnSuccess::Continue
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopStep {
    pub max_iterations: u32,
    pub steps: Vec<Step>,
    #[serde(default = "default_on_max_iterations")]
    pub on_max_iterations: StepAction,
}

fn default_on_max_iterations() -> StepAction {
    StepAction::Block
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeStep {
    #[serde(default = "default_require_review")]
    pub require_review: bool,
}

fn default_require_review() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Agent(AgentStep),
    Script(ScriptStep),
    Loop(LoopStep),
    Merge(MergeStep),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
    /// Strict-boolean guard, rendered against the parent context before execution.
    #[serde(default)]
    pub when: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grimoire {
    pub name: String,
    pub steps: Vec<Step>,
}

/// Parses the short duration strings grimoires use (`"15m"`, `"5m"`, `"2h"`, `"90s"`),
/// mirroring the inverse of [`crate::time_fmt::format_elapsed`].
pub fn parse_short_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (num, unit) = s.split_at(s.find(|c: char| c.is_alphabetic())?);
    let n: u64 = num.parse().ok()?;
    let secs = match unit {
        "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        "d" => n * 86400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

mod duration_opt_secs {
    use super::parse_short_duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value as JsonValue;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        v.map(|d| d.as_secs()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw = Option::<JsonValue>::deserialize(d)?;
        Ok(match raw {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Number(n)) => n.as_u64().map(Duration::from_secs),
            Some(JsonValue::String(s)) => {
                parse_short_duration(&s).or_else(|| s.parse::<u64>().ok().map(Duration::from_secs))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
#[path = "grimoire_tests.rs"]
mod tests;
