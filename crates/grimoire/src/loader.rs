// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grimoire and spell loading: builtins embedded in the binary, overridden
//! by-name by `<workspace>/.coven/{grimoires,spells}/` files.
//!
//! Grounded on `oj-runbook::find`'s directory-scan-plus-override shape, but
//! simpler: Coven has exactly two layers (builtin, user) instead of `oj`'s
//! arbitrary import graph.

use crate::builtin;
use crate::render::SpellResolver;
use coven_core::{CovenError, Grimoire, LoopStep, Result, Spell, SpellSource, Step, StepKind};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn user_dir(workspace: &Path, sub: &str) -> PathBuf {
    workspace.join(".coven").join(sub)
}

fn read_yaml_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<(String, T)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = dir.join("*.yaml");
    let mut out = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())
        .map_err(|e| CovenError::Internal(format!("invalid glob pattern: {e}")))?
    {
        let path = entry.map_err(|e| CovenError::Internal(e.to_string()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let text = fs::read_to_string(&path)?;
        let value: T = serde_yaml::from_str(&text)
            .map_err(|e| CovenError::TemplateParse(format!("{}: {e}", path.display())))?;
        out.push((stem, value));
    }
    Ok(out)
}

/// Validates a grimoire's structural invariants (spec.md §4.2):
/// unique step names across the whole grimoire (nested included), and every
/// loop has at least one iteration configured.
pub fn validate_grimoire(grimoire: &Grimoire) -> Result<()> {
    let mut seen = HashSet::new();
    fn walk(steps: &[Step], seen: &mut HashSet<String>) -> Result<()> {
        for step in steps {
            if !seen.insert(step.name.clone()) {
                return Err(CovenError::TemplateParse(format!(
                    "duplicate step name in grimoire: {}",
                    step.name
                )));
            }
            if let StepKind::Loop(LoopStep {
                max_iterations,
                steps: nested,
                ..
            }) = &step.kind
            {
                if *max_iterations == 0 {
                    return Err(CovenError::TemplateParse(format!(
                        "loop step {} has max_iterations: 0",
                        step.name
                    )));
                }
                walk(nested, seen)?;
            }
        }
        Ok(())
    }
    walk(&grimoire.steps, &mut seen)
}

/// Loads builtin and user grimoires, keyed by name. User grimoires override
/// builtins sharing the same name.
#[derive(Debug, Clone, Default)]
pub struct GrimoireStore {
    grimoires: IndexMap<String, Grimoire>,
}

impl GrimoireStore {
    /// Loads builtins, then overlays `<workspace>/.coven/grimoires/*.yaml`.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut grimoires = IndexMap::new();
        for (_, source) in builtin::GRIMOIRES {
            let g: Grimoire = serde_yaml::from_str(source)
                .map_err(|e| CovenError::Internal(format!("builtin grimoire invalid: {e}")))?;
            validate_grimoire(&g)?;
            grimoires.insert(g.name.clone(), g);
        }
        let dir = user_dir(workspace, "grimoires");
        for (_, g) in read_yaml_dir::<Grimoire>(&dir)? {
            validate_grimoire(&g)?;
            grimoires.insert(g.name.clone(), g);
        }
        Ok(Self { grimoires })
    }

    /// Re-scans the user directory, leaving builtins untouched. Does not
    /// affect already-resolved workflow runs (spec.md §4.2: "active workflows
    /// keep their already-resolved grimoire").
    pub fn reload(&mut self, workspace: &Path) -> Result<()> {
        *self = Self::load(workspace)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Grimoire> {
        self.grimoires.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.grimoires.keys().map(|s| s.as_str())
    }

    /// Copies any builtin grimoire missing from the user directory, never
    /// overwriting a file that already exists (spec.md §4.8 step 4).
    pub fn materialize_defaults(workspace: &Path) -> Result<()> {
        let dir = user_dir(workspace, "grimoires");
        fs::create_dir_all(&dir)?;
        for (stem, source) in builtin::GRIMOIRES {
            let path = dir.join(format!("{stem}.yaml"));
            if !path.exists() {
                fs::write(path, source)?;
            }
        }
        Ok(())
    }
}

/// Loads builtin and user spells, keyed by name. User spells override
/// builtins sharing the same name.
#[derive(Debug, Clone, Default)]
pub struct SpellStore {
    spells: IndexMap<String, Spell>,
}

impl SpellStore {
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut spells = IndexMap::new();
        for (name, content) in builtin::SPELLS {
            spells.insert(
                name.to_string(),
                Spell {
                    name: name.to_string(),
                    content: content.to_string(),
                    source: SpellSource::Builtin,
                },
            );
        }
        let dir = user_dir(workspace, "spells");
        if dir.is_dir() {
            let pattern = dir.join("*.md");
            for entry in glob::glob(&pattern.to_string_lossy())
                .map_err(|e| CovenError::Internal(format!("invalid glob pattern: {e}")))?
            {
                let path = entry.map_err(|e| CovenError::Internal(e.to_string()))?;
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                let content = fs::read_to_string(&path)?;
                spells.insert(
                    name.clone(),
                    Spell {
                        name,
                        content,
                        source: SpellSource::User,
                    },
                );
            }
        }
        Ok(Self { spells })
    }

    pub fn reload(&mut self, workspace: &Path) -> Result<()> {
        *self = Self::load(workspace)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Spell> {
        self.spells.get(name)
    }

    /// Resolves a step's `spell` field: inline source if it contains a
    /// newline, otherwise a by-name lookup (spec.md §4.3).
    pub fn resolve_step_spell(&self, reference: &str) -> Result<String> {
        if coven_core::spell::is_inline_spell(reference) {
            return Ok(reference.to_string());
        }
        self.get(reference)
            .map(|s| s.content.clone())
            .ok_or_else(|| CovenError::SpellNotFound(reference.to_string()))
    }

    pub fn materialize_defaults(workspace: &Path) -> Result<()> {
        let dir = user_dir(workspace, "spells");
        fs::create_dir_all(&dir)?;
        for (name, content) in builtin::SPELLS {
            let path = dir.join(format!("{name}.md"));
            if !path.exists() {
                fs::write(path, content)?;
            }
        }
        Ok(())
    }
}

impl SpellResolver for SpellStore {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).map(|s| s.content.clone())
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
