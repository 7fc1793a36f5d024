// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task Store (spec.md §4.1): the CRUD, claim/release, and hierarchy
//! operations every other component builds on. Every mutation is expressed
//! as one or more [`coven_core::Event`]s applied and persisted through the
//! shared [`EventBus`].

use crate::error::Result;
use crate::event_bus::EventBus;
use coven_core::{
    AuditKind, Clock, CovenError, Event, IdGen, Task, TaskAuditEntry, TaskFilter, TaskId,
    TaskStatus,
};
use std::time::Duration;

/// Default interval after which an unreleased claim is considered stale
/// (spec.md §4.1, overridable by daemon config's `stale_claim_timeout`).
pub const DEFAULT_STALE_CLAIM_TIMEOUT: Duration = Duration::from_secs(600);

/// Retention window for soft-deleted tasks before `purge` removes them.
pub const DEFAULT_SOFT_DELETE_RETENTION: Duration = Duration::from_secs(30 * 86400);

#[derive(Clone)]
pub struct TaskStore<C: Clock, I: IdGen> {
    bus: EventBus,
    clock: C,
    ids: I,
}

/// Fields a caller may change via [`TaskStore::update`]; `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub priority: Option<i32>,
}

impl<C: Clock, I: IdGen> TaskStore<C, I> {
    pub fn new(bus: EventBus, clock: C, ids: I) -> Self {
        Self { bus, clock, ids }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.bus.state().lock().get_task(id).cloned()
    }

    pub fn list(&self, filter: &TaskFilter) -> Vec<Task> {
        let state = self.bus.state();
        let state = state.lock();
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| filter.include_deleted || t.status != TaskStatus::SoftDeleted)
            .filter(|t| {
                filter
                    .statuses
                    .as_ref()
                    .map_or(true, |s| s.contains(&t.status))
            })
            .filter(|t| {
                filter
                    .priority_range
                    .map_or(true, |(lo, hi)| t.priority >= lo && t.priority <= hi)
            })
            .filter(|t| filter.tags.matches(&t.tags))
            .filter(|t| {
                filter
                    .parent
                    .as_ref()
                    .map_or(true, |p| &t.parent == p)
            })
            .filter(|t| !filter.ready_only || (t.is_ready() && !has_blocked_ancestor(&state, t)))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| (a.priority, a.created_at).cmp(&(b.priority, b.created_at)));
        tasks
    }

    pub fn create(
        &self,
        title: String,
        body: String,
        priority: i32,
        tags: impl IntoIterator<Item = String>,
        parent: Option<TaskId>,
    ) -> Result<Task> {
        let state = self.bus.state();
        let depth = if let Some(parent_id) = &parent {
            let state = state.lock();
            let parent_task = state
                .get_task(parent_id.as_str())
                .ok_or_else(|| CovenError::NotFound(parent_id.to_string()))?;
            parent_task.depth + 1
        } else {
            0
        };
        let now = self.clock.now();
        let task = Task {
            id: TaskId::new(self.ids.next()),
            title,
            body,
            status: TaskStatus::Open,
            priority,
            tags: tags.into_iter().collect(),
            parent,
            depth,
            claim: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.bus
            .publish(vec![Event::TaskCreated { task: task.clone() }])?;
        Ok(task)
    }

    pub fn update(&self, id: &str, changes: TaskUpdate) -> Result<Task> {
        let existing = self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()))?;
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskFieldsUpdated {
            id: existing.id.clone(),
            title: changes.title,
            body: changes.body,
            priority: changes.priority,
            at,
        }])?;
        if let Some(priority) = changes.priority {
            self.audit(
                existing.id.clone(),
                AuditKind::Priority,
                Some(existing.priority.to_string()),
                Some(priority.to_string()),
                "user",
                at,
            )?;
        }
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    pub fn add_tags(&self, id: &str, tags: Vec<String>) -> Result<Task> {
        let existing = self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()))?;
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskTagsChanged {
            id: existing.id.clone(),
            added: tags.clone(),
            removed: vec![],
            at,
        }])?;
        self.audit(existing.id, AuditKind::Tag, None, Some(tags.join(",")), "user", at)?;
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    pub fn remove_tags(&self, id: &str, tags: Vec<String>) -> Result<Task> {
        let existing = self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()))?;
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskTagsChanged {
            id: existing.id.clone(),
            added: vec![],
            removed: tags,
            at,
        }])?;
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    /// Reparents `id` under `new_parent`, rejecting cycles (`new_parent` is
    /// `id` itself or one of its descendants), and recomputes depth for the
    /// whole subtree in one event.
    pub fn reparent(&self, id: &str, new_parent: Option<TaskId>) -> Result<Task> {
        let state = self.bus.state();
        let (task, subtree_depths) = {
            let state = state.lock();
            let task = state
                .get_task(id)
                .ok_or_else(|| CovenError::NotFound(id.to_string()))?
                .clone();
            if let Some(new_parent) = &new_parent {
                if new_parent.as_str() == task.id.as_str()
                    || descendants_of(&state, &task.id).iter().any(|d| d == new_parent)
                {
                    return Err(CovenError::WouldCreateCycle(new_parent.to_string()).into());
                }
            }
            let new_depth = match &new_parent {
                Some(p) => state.get_task(p.as_str()).map(|t| t.depth + 1).unwrap_or(0),
                None => 0,
            };
            // BFS outward from `task.id` so each descendant's new depth is derived
            // from its own parent's already-recomputed depth, not its stale one.
            let mut depths = vec![(task.id.clone(), new_depth)];
            let mut frontier = vec![(task.id.clone(), new_depth)];
            while let Some((parent_id, parent_depth)) = frontier.pop() {
                for child in state.children_of(&parent_id) {
                    let child_depth = parent_depth + 1;
                    depths.push((child.id.clone(), child_depth));
                    frontier.push((child.id.clone(), child_depth));
                }
            }
            (task, depths)
        };
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskReparented {
            id: task.id.clone(),
            new_parent,
            subtree_depths,
            at,
        }])?;
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    pub fn claim(&self, id: &str, claimant: &str) -> Result<Task> {
        self.claim_with_timeout(id, claimant, DEFAULT_STALE_CLAIM_TIMEOUT)
    }

    /// Atomically claims `id` for `claimant`: the task must be open and
    /// either unclaimed, or claimed by `claimant` itself with a claim older
    /// than `stale_timeout` (spec.md §4.1's compare-and-swap contract —
    /// the same recovery the 30s sweep and `reclaim` already give a
    /// claimant over its own stale claim, but reachable through `claim`
    /// too).
    pub fn claim_with_timeout(
        &self,
        id: &str,
        claimant: &str,
        stale_timeout: Duration,
    ) -> Result<Task> {
        let task = self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()))?;
        let mut is_own_stale_claim = false;
        if let Some(existing) = &task.claim {
            let at = self.clock.now();
            is_own_stale_claim = existing.claimant == claimant
                && at.signed_duration_since(existing.claimed_at).to_std().unwrap_or_default()
                    > stale_timeout;
            if !is_own_stale_claim {
                return Err(CovenError::AlreadyClaimed {
                    claimant: existing.claimant.clone(),
                }
                .into());
            }
        }
        // An unclaimed task must be Open; a stale claim of our own already
        // carries the task in `InProgress`, which is exactly what refreshing
        // it should leave it in.
        if !is_own_stale_claim && task.status != TaskStatus::Open {
            return Err(CovenError::InvalidStatus {
                from: task.status.to_string(),
                to: TaskStatus::InProgress.to_string(),
            }
            .into());
        }
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskClaimed {
            id: task.id.clone(),
            claimant: claimant.to_string(),
            at,
        }])?;
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    /// Re-claims an already-claimed task without releasing it first
    /// (renewal, used by a long-running claimant to reset the stale timer).
    pub fn reclaim(&self, id: &str, claimant: &str) -> Result<Task> {
        let task = self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()))?;
        match &task.claim {
            Some(c) if c.claimant != claimant => {
                return Err(CovenError::AlreadyClaimed {
                    claimant: c.claimant.clone(),
                }
                .into());
            }
            None => return Err(CovenError::NotFound(id.to_string()).into()),
            _ => {}
        }
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskReclaimed {
            id: task.id.clone(),
            claimant: claimant.to_string(),
            at,
        }])?;
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    pub fn release(&self, id: &str) -> Result<Task> {
        let task = self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()))?;
        let at = self.clock.now();
        self.bus
            .publish(vec![Event::TaskReleased { id: task.id.clone(), at }])?;
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<Task> {
        let task = self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()))?;
        if !task.status.can_transition_to(status) {
            return Err(CovenError::InvalidStatus {
                from: task.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskStatusChanged {
            id: task.id.clone(),
            status,
            at,
        }])?;
        self.audit(
            task.id.clone(),
            AuditKind::Status,
            Some(task.status.to_string()),
            Some(status.to_string()),
            "user",
            at,
        )?;
        self.get(id).ok_or_else(|| CovenError::NotFound(id.to_string()).into())
    }

    /// Soft-deletes `id` and every descendant in one event.
    pub fn delete(&self, id: &str) -> Result<()> {
        let state = self.bus.state();
        let ids = {
            let state = state.lock();
            let task = state
                .get_task(id)
                .ok_or_else(|| CovenError::NotFound(id.to_string()))?;
            let mut ids = vec![task.id.clone()];
            ids.extend(descendants_of(&state, &task.id));
            ids
        };
        let at = self.clock.now();
        self.bus.publish(vec![Event::TaskDeleted { ids, at }])?;
        Ok(())
    }

    /// Permanently removes soft-deleted tasks past the retention window.
    pub fn purge(&self, retention: Duration) -> Result<Vec<TaskId>> {
        let now = self.clock.now();
        let ids: Vec<TaskId> = {
            let state = self.bus.state();
            let state = state.lock();
            state
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::SoftDeleted)
                .filter(|t| {
                    t.deleted_at.map_or(false, |d| {
                        now.signed_duration_since(d).to_std().unwrap_or_default() >= retention
                    })
                })
                .map(|t| t.id.clone())
                .collect()
        };
        if !ids.is_empty() {
            self.bus.publish(vec![Event::TaskPurged { ids: ids.clone() }])?;
        }
        Ok(ids)
    }

    pub fn history(&self, id: &str, limit: usize) -> Vec<TaskAuditEntry> {
        let state = self.bus.state();
        let state = state.lock();
        let Some(task) = state.get_task(id) else {
            return Vec::new();
        };
        let mut entries = state
            .task_audit
            .get(task.id.as_str())
            .cloned()
            .unwrap_or_default();
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
        entries
    }

    /// Walks from `id` up to the root, nearest parent first.
    pub fn ancestors(&self, id: &str) -> Vec<Task> {
        let state = self.bus.state();
        let state = state.lock();
        let mut out = Vec::new();
        let Some(task) = state.get_task(id) else {
            return out;
        };
        let mut current = task.parent.clone();
        while let Some(parent_id) = current {
            let Some(parent) = state.get_task(parent_id.as_str()) else {
                break;
            };
            current = parent.parent.clone();
            out.push(parent.clone());
        }
        out
    }

    /// Every descendant of `id`, in no particular guaranteed order.
    pub fn subtree(&self, id: &str) -> Vec<Task> {
        let state = self.bus.state();
        let state = state.lock();
        let Some(task) = state.get_task(id) else {
            return Vec::new();
        };
        descendants_of(&state, &task.id)
            .into_iter()
            .filter_map(|descendant_id| state.get_task(descendant_id.as_str()).cloned())
            .collect()
    }

    fn audit(
        &self,
        task_id: TaskId,
        kind: AuditKind,
        before: Option<String>,
        after: Option<String>,
        actor: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        self.bus.publish(vec![Event::TaskAuditAppended {
            task_id,
            kind,
            before,
            after,
            actor: actor.to_string(),
            at,
        }])?;
        Ok(())
    }

    /// Releases every claim older than `timeout`, returning the affected
    /// task ids (spec.md §4.7's stale-claim sweep).
    pub fn sweep_stale_claims(&self, timeout: Duration) -> Result<Vec<TaskId>> {
        let now = self.clock.now();
        let stale: Vec<TaskId> = {
            let state = self.bus.state();
            let state = state.lock();
            state
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::InProgress)
                .filter_map(|t| t.claim.as_ref().map(|c| (t.id.clone(), c.claimed_at)))
                .filter(|(_, claimed_at)| {
                    now.signed_duration_since(*claimed_at).to_std().unwrap_or_default() >= timeout
                })
                .map(|(id, _)| id)
                .collect()
        };
        let mut events = Vec::new();
        for id in &stale {
            events.push(Event::TaskReleased {
                id: id.clone(),
                at: now,
            });
        }
        if !events.is_empty() {
            self.bus.publish(events)?;
        }
        Ok(stale)
    }
}

/// An operation applied atomically to a batch of tasks via [`TaskStore::bulk`].
#[derive(Debug, Clone)]
pub enum BulkOp {
    AddTags(Vec<String>),
    RemoveTags(Vec<String>),
    SetStatus(TaskStatus),
    SetPriority(i32),
    Delete,
}

impl<C: Clock, I: IdGen> TaskStore<C, I> {
    /// Applies `op` to every task in `ids` as a single [`EventBus::publish`]
    /// call: all tasks are validated before any event is built, so a
    /// not-found id or an invalid status transition anywhere in the batch
    /// rejects the whole request with nothing published (spec.md §4.1's
    /// "all-or-nothing" bulk contract).
    pub fn bulk(&self, ids: &[String], op: BulkOp) -> Result<Vec<Task>> {
        let state_handle = self.bus.state();
        let tasks: Vec<Task> = {
            let state = state_handle.lock();
            ids.iter()
                .map(|id| {
                    state
                        .get_task(id)
                        .cloned()
                        .ok_or_else(|| CovenError::NotFound(id.clone()))
                })
                .collect::<std::result::Result<_, _>>()?
        };

        let at = self.clock.now();
        let mut events = Vec::new();
        match &op {
            BulkOp::AddTags(tags) => {
                for task in &tasks {
                    events.push(Event::TaskTagsChanged {
                        id: task.id.clone(),
                        added: tags.clone(),
                        removed: vec![],
                        at,
                    });
                }
            }
            BulkOp::RemoveTags(tags) => {
                for task in &tasks {
                    events.push(Event::TaskTagsChanged {
                        id: task.id.clone(),
                        added: vec![],
                        removed: tags.clone(),
                        at,
                    });
                }
            }
            BulkOp::SetStatus(status) => {
                for task in &tasks {
                    if !task.status.can_transition_to(*status) {
                        return Err(CovenError::InvalidStatus {
                            from: task.status.to_string(),
                            to: status.to_string(),
                        }
                        .into());
                    }
                }
                for task in &tasks {
                    events.push(Event::TaskStatusChanged {
                        id: task.id.clone(),
                        status: *status,
                        at,
                    });
                    events.push(Event::TaskAuditAppended {
                        task_id: task.id.clone(),
                        kind: AuditKind::Status,
                        before: Some(task.status.to_string()),
                        after: Some(status.to_string()),
                        actor: "user".to_string(),
                        at,
                    });
                }
            }
            BulkOp::SetPriority(priority) => {
                for task in &tasks {
                    events.push(Event::TaskFieldsUpdated {
                        id: task.id.clone(),
                        title: None,
                        body: None,
                        priority: Some(*priority),
                        at,
                    });
                    events.push(Event::TaskAuditAppended {
                        task_id: task.id.clone(),
                        kind: AuditKind::Priority,
                        before: Some(task.priority.to_string()),
                        after: Some(priority.to_string()),
                        actor: "user".to_string(),
                        at,
                    });
                }
            }
            BulkOp::Delete => {
                let state = state_handle.lock();
                let mut all_ids = Vec::new();
                for task in &tasks {
                    all_ids.push(task.id.clone());
                    all_ids.extend(descendants_of(&state, &task.id));
                }
                drop(state);
                events.push(Event::TaskDeleted { ids: all_ids, at });
            }
        }

        self.bus.publish(events)?;
        let state = state_handle.lock();
        Ok(ids.iter().filter_map(|id| state.get_task(id).cloned()).collect())
    }
}

/// Walks `task`'s ancestor chain looking for a `Blocked` status, per
/// spec.md §4.1's "ready" definition: open, unclaimed, and not
/// blocked-by-ancestor.
fn has_blocked_ancestor(state: &coven_storage::MaterializedState, task: &Task) -> bool {
    let mut current = task.parent.clone();
    while let Some(parent_id) = current {
        let Some(parent) = state.get_task(parent_id.as_str()) else {
            return false;
        };
        if parent.status == TaskStatus::Blocked {
            return true;
        }
        current = parent.parent.clone();
    }
    false
}

fn descendants_of(state: &coven_storage::MaterializedState, id: &TaskId) -> Vec<TaskId> {
    let mut out = Vec::new();
    let mut frontier = vec![id.clone()];
    while let Some(current) = frontier.pop() {
        for child in state.children_of(&current) {
            out.push(child.id.clone());
            frontier.push(child.id.clone());
        }
    }
    out
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
