// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves the workspace a CLI invocation targets: the current directory,
//! walking up to find an existing `.coven/` the way `git` walks up to find
//! `.git`, falling back to the current directory itself (the daemon creates
//! `.coven/` lazily on first `covend` start, spec.md §4.8 step 1).

use std::path::{Path, PathBuf};

pub fn find_workspace_root(start: &Path) -> PathBuf {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(".coven").is_dir() {
            return dir;
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return start.to_path_buf(),
        }
    }
}

pub fn current_workspace_root() -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(find_workspace_root(&cwd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_coven_dir_in_an_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".coven")).unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_workspace_root(&nested), dir.path());
    }

    #[test]
    fn falls_back_to_start_when_no_coven_dir_exists() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_workspace_root(&nested), nested);
    }
}
