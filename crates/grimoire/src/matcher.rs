// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grimoire matcher: resolves `task -> grimoire` via a direct-tag shortcut,
//! an ordered rule pipeline, parent inheritance, and a configured default
//! (spec.md §4.2).
//!
//! Grounded on `oj-runbook::find`'s override-by-name convention for the
//! loader half; the rule pipeline itself has no direct teacher precedent and
//! is written from the specification in the loader's idiom (plain structs,
//! `serde_yaml`). Reload on change is the daemon's `config_watch` poll, not
//! a watcher owned by this module.

use coven_core::task::glob_match;
use coven_core::{CovenError, Result, Task};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_priority_range() -> Option<(i32, i32)> {
    None
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherRule {
    #[serde(default)]
    pub any_tags: Vec<String>,
    #[serde(default)]
    pub all_tags: Vec<String>,
    #[serde(default)]
    pub not_tags: Vec<String>,
    #[serde(default)]
    pub priority: Option<Vec<i32>>,
    #[serde(default = "default_priority_range")]
    pub priority_range: Option<(i32, i32)>,
    #[serde(default)]
    pub body_contains: Option<String>,
    pub grimoire: String,
}

impl MatcherRule {
    /// Whether `self`'s predicate is a strict subset of `other`'s — used to
    /// flag unreachable later rules. Conservative: only flags the case where
    /// every tag/priority/body constraint on `self` is also present, equal
    /// or tighter, on `other`, and at least one constraint differs.
    fn is_subset_of(&self, other: &MatcherRule) -> bool {
        let tags_subset = |a: &[String], b: &[String]| a.iter().all(|t| b.contains(t));
        if !tags_subset(&other.any_tags, &self.any_tags) && !other.any_tags.is_empty() {
            return false;
        }
        if !tags_subset(&other.all_tags, &self.all_tags) {
            return false;
        }
        if !tags_subset(&other.not_tags, &self.not_tags) {
            return false;
        }
        let priority_subset = match (&self.priority, &other.priority) {
            (_, None) => true,
            (Some(a), Some(b)) => a.iter().all(|p| b.contains(p)),
            (None, Some(_)) => false,
        };
        if !priority_subset {
            return false;
        }
        let range_subset = match (self.priority_range, other.priority_range) {
            (_, None) => true,
            (Some((alo, ahi)), Some((blo, bhi))) => alo >= blo && ahi <= bhi,
            (None, Some(_)) => false,
        };
        if !range_subset {
            return false;
        }
        match (&self.body_contains, &other.body_contains) {
            (_, None) => true,
            (Some(a), Some(b)) => a.to_lowercase().contains(&b.to_lowercase()),
            (None, Some(_)) => false,
        }
    }

    fn matches(&self, task: &Task) -> bool {
        if !self.any_tags.is_empty() && !self.any_tags.iter().any(|p| {
            task.tags.iter().any(|t| glob_match(p, t))
        }) {
            return false;
        }
        if !self.all_tags.iter().all(|p| {
            task.tags.iter().any(|t| glob_match(p, t))
        }) {
            return false;
        }
        if self.not_tags.iter().any(|p| {
            task.tags.iter().any(|t| glob_match(p, t))
        }) {
            return false;
        }
        // priority and priority_range are both intersected when set (spec's
        // stated resolution for the otherwise-unspecified both-set case).
        if let Some(allowed) = &self.priority {
            if !allowed.contains(&task.priority) {
                return false;
            }
        }
        if let Some((lo, hi)) = self.priority_range {
            if task.priority < lo || task.priority > hi {
                return false;
            }
        }
        if let Some(needle) = &self.body_contains {
            if !task.body.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub rules: Vec<MatcherRule>,
    pub default_grimoire: String,
}

impl MatcherConfig {
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = Self::path(workspace);
        if !path.exists() {
            return Ok(Self {
                rules: Vec::new(),
                default_grimoire: "quick-fix".to_string(),
            });
        }
        let text = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&text)
            .map_err(|e| CovenError::MatcherInvalid(format!("{}: {e}", path.display())))
    }

    pub fn path(workspace: &Path) -> std::path::PathBuf {
        workspace.join(".coven").join("grimoire-matchers.yaml")
    }

    /// Unreachable-rule warnings: for each rule, any strictly earlier rule
    /// whose predicate subsumes it.
    pub fn unreachable_rule_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (i, rule) in self.rules.iter().enumerate() {
            for earlier in &self.rules[..i] {
                if rule.is_subset_of(earlier) {
                    warnings.push(format!(
                        "rule {} (-> {}) is unreachable: subsumed by an earlier rule (-> {})",
                        i, rule.grimoire, earlier.grimoire
                    ));
                    break;
                }
            }
        }
        warnings
    }
}

/// The outcome of matching a task to a grimoire, with enough detail for the
/// daemon's matcher-debug endpoint (spec §4.2's "rule index or inherited/defaulted").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSource {
    DirectTag,
    Rule(usize),
    Inherited,
    Default,
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub grimoire: String,
    pub source: MatchSource,
}

const DIRECT_TAG_PREFIX: &str = "grimoire:";

/// Resolves a task to a grimoire name per spec.md §4.2's four-step pipeline.
/// `grimoire_exists` lets the caller check against a loaded `GrimoireStore`
/// without this module depending on it directly. `ancestor_resolution`
/// supplies the parent's already-resolved match, if any, for inheritance.
pub fn resolve(
    task: &Task,
    config: &MatcherConfig,
    grimoire_exists: impl Fn(&str) -> bool,
    ancestor_resolution: Option<&str>,
) -> MatchResult {
    if let Some(name) = task
        .tags
        .iter()
        .find_map(|t| t.strip_prefix(DIRECT_TAG_PREFIX))
    {
        if grimoire_exists(name) {
            return MatchResult {
                grimoire: name.to_string(),
                source: MatchSource::DirectTag,
            };
        }
    }

    for (i, rule) in config.rules.iter().enumerate() {
        if rule.matches(task) {
            return MatchResult {
                grimoire: rule.grimoire.clone(),
                source: MatchSource::Rule(i),
            };
        }
    }

    if let Some(inherited) = ancestor_resolution {
        return MatchResult {
            grimoire: inherited.to_string(),
            source: MatchSource::Inherited,
        };
    }

    MatchResult {
        grimoire: config.default_grimoire.clone(),
        source: MatchSource::Default,
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
