// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: the unit of work the scheduler claims and drives through a workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

crate::define_id! {
    /// Unique identifier for a task.
    pub struct TaskId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Open,
    InProgress,
    PendingMerge,
    Blocked,
    Closed,
    SoftDeleted,
}

impl TaskStatus {
    /// Valid transitions, per the scheduler's state diagram (spec §4.7).
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (InProgress, Closed)
                | (InProgress, PendingMerge)
                | (InProgress, Blocked)
                | (InProgress, Open)
                | (Blocked, InProgress)
                | (PendingMerge, InProgress)
                | (PendingMerge, Blocked)
                | (_, SoftDeleted)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::PendingMerge => "pending-merge",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Closed => "closed",
            TaskStatus::SoftDeleted => "soft-deleted",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claimant: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub body: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub tags: BTreeSet<String>,
    pub parent: Option<TaskId>,
    pub depth: u32,
    pub claim: Option<ClaimRecord>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_ready(&self) -> bool {
        self.status == TaskStatus::Open && self.claim.is_none()
    }
}

/// Which facet of a task an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Status,
    Claim,
    Parent,
    Tag,
    Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAuditEntry {
    pub task_id: TaskId,
    pub kind: AuditKind,
    pub before: Option<String>,
    pub after: Option<String>,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Glob + set-algebra filter for tag matching, shared by `List` and the grimoire matcher.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub any: Vec<String>,
    pub all: Vec<String>,
    pub not: Vec<String>,
}

impl TagFilter {
    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        let glob_any = |pattern: &str, tags: &BTreeSet<String>| {
            tags.iter().any(|t| glob_match(pattern, t))
        };

        if !self.any.is_empty() && !self.any.iter().any(|p| glob_any(p, tags)) {
            return false;
        }
        if !self.all.iter().all(|p| glob_any(p, tags)) {
            return false;
        }
        if self.not.iter().any(|p| glob_any(p, tags)) {
            return false;
        }
        true
    }
}

/// Minimal doublestar-style glob matcher (`*` and `**` segment wildcards) for tag patterns.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }
    let pat_bytes: Vec<&str> = pattern.split('*').collect();
    let mut rest = candidate;
    for (i, part) in pat_bytes.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !rest.starts_with(part) {
                return false;
            }
            rest = &rest[part.len()..];
        } else if i == pat_bytes.len() - 1 {
            return rest.ends_with(part);
        } else if let Some(pos) = rest.find(part) {
            rest = &rest[pos + part.len()..];
        } else {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub statuses: Option<Vec<TaskStatus>>,
    pub priority_range: Option<(i32, i32)>,
    pub tags: TagFilter,
    pub parent: Option<Option<TaskId>>,
    pub ready_only: bool,
    pub include_deleted: bool,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
