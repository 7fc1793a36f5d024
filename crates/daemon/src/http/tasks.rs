// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/tasks*` (spec.md §6.2): CRUD, hierarchy, claim/release, and the
//! grimoire-match debug endpoint. Every mutation goes straight through
//! `coven_engine::TaskStore`, which is the sole place these invariants
//! (cycle checks, status transitions, all-or-nothing bulk ops) are enforced.

use super::AppError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use coven_core::{Task, TaskAuditEntry, TaskFilter, TaskId, TaskStatus};
use coven_engine::{BulkOp, TaskUpdate};
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list).post(create))
        .route("/tasks/ready", get(ready))
        .route("/tasks/bulk", post(bulk))
        .route("/tasks/{id}", get(get_one).patch(update).delete(delete))
        .route("/tasks/{id}/claim", post(claim))
        .route("/tasks/{id}/reclaim", post(reclaim))
        .route("/tasks/{id}/release", post(release))
        .route("/tasks/{id}/status", post(set_status))
        .route("/tasks/{id}/tags", post(add_tags).delete(remove_tags))
        .route("/tasks/{id}/reparent", post(reparent))
        .route("/tasks/{id}/children", get(children))
        .route("/tasks/{id}/ancestors", get(ancestors))
        .route("/tasks/{id}/subtree", get(subtree))
        .route("/tasks/{id}/history", get(history))
        .route("/tasks/{id}/grimoire-match", get(grimoire_match))
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    status: Option<String>,
    priority_min: Option<i32>,
    priority_max: Option<i32>,
    tag: Option<String>,
    parent: Option<String>,
    include_deleted: Option<bool>,
}

fn filter_from_query(q: &ListQuery) -> Result<TaskFilter, AppError> {
    let statuses = match &q.status {
        Some(s) => Some(
            s.split(',')
                .map(parse_status)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };
    let priority_range = match (q.priority_min, q.priority_max) {
        (Some(lo), Some(hi)) => Some((lo, hi)),
        (Some(lo), None) => Some((lo, i32::MAX)),
        (None, Some(hi)) => Some((i32::MIN, hi)),
        (None, None) => None,
    };
    let mut tags = coven_core::task::TagFilter::default();
    if let Some(tag) = &q.tag {
        tags.any = tag.split(',').map(str::to_string).collect();
    }
    Ok(TaskFilter {
        statuses,
        priority_range,
        tags,
        parent: q.parent.as_deref().map(|p| {
            if p.is_empty() {
                None
            } else {
                Some(TaskId::new(p))
            }
        }),
        ready_only: false,
        include_deleted: q.include_deleted.unwrap_or(false),
    })
}

fn parse_status(s: &str) -> Result<TaskStatus, AppError> {
    match s.trim() {
        "open" => Ok(TaskStatus::Open),
        "in-progress" | "in_progress" => Ok(TaskStatus::InProgress),
        "pending-merge" | "pending_merge" => Ok(TaskStatus::PendingMerge),
        "blocked" => Ok(TaskStatus::Blocked),
        "closed" => Ok(TaskStatus::Closed),
        "soft-deleted" | "soft_deleted" => Ok(TaskStatus::SoftDeleted),
        other => Err(AppError::from(coven_core::CovenError::Internal(format!(
            "unknown task status: {other}"
        )))),
    }
}

async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let filter = filter_from_query(&q)?;
    let scheduler = state.scheduler.lock().await;
    Ok(Json(scheduler.tasks().list(&filter)))
}

async fn ready(State(state): State<AppState>) -> Json<Vec<Task>> {
    let scheduler = state.scheduler.lock().await;
    Json(scheduler.tasks().list(&TaskFilter {
        ready_only: true,
        ..Default::default()
    }))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    tags: Vec<String>,
    parent: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let scheduler = state.scheduler.lock().await;
    let task = scheduler.tasks().create(
        req.title,
        req.body,
        req.priority,
        req.tags,
        req.parent.map(TaskId::new),
    )?;
    state.wake.notify_one();
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    scheduler
        .tasks()
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::from(coven_core::CovenError::NotFound(id)))
}

#[derive(Debug, Deserialize, Default)]
struct UpdateRequest {
    title: Option<String>,
    body: Option<String>,
    priority: Option<i32>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    let task = scheduler.tasks().update(
        &id,
        TaskUpdate {
            title: req.title,
            body: req.body,
            priority: req.priority,
        },
    )?;
    Ok(Json(task))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let scheduler = state.scheduler.lock().await;
    scheduler.tasks().delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ClaimRequest {
    #[serde(default = "default_claimant")]
    claimant: String,
}

fn default_claimant() -> String {
    "cli".to_string()
}

async fn claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    Ok(Json(scheduler.tasks().claim(&id, &req.claimant)?))
}

async fn reclaim(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    Ok(Json(scheduler.tasks().reclaim(&id, &req.claimant)?))
}

async fn release(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    Ok(Json(scheduler.tasks().release(&id)?))
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: String,
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Task>, AppError> {
    let status = parse_status(&req.status)?;
    let scheduler = state.scheduler.lock().await;
    let task = scheduler.tasks().set_status(&id, status)?;
    state.wake.notify_one();
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
struct TagsRequest {
    tags: Vec<String>,
}

async fn add_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    Ok(Json(scheduler.tasks().add_tags(&id, req.tags)?))
}

async fn remove_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    Ok(Json(scheduler.tasks().remove_tags(&id, req.tags)?))
}

#[derive(Debug, Deserialize)]
struct ReparentRequest {
    parent: Option<String>,
}

async fn reparent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReparentRequest>,
) -> Result<Json<Task>, AppError> {
    let scheduler = state.scheduler.lock().await;
    Ok(Json(
        scheduler.tasks().reparent(&id, req.parent.map(TaskId::new))?,
    ))
}

async fn children(State(state): State<AppState>, Path(id): Path<String>) -> Json<Vec<Task>> {
    let scheduler = state.scheduler.lock().await;
    Json(scheduler.tasks().list(&TaskFilter {
        parent: Some(Some(TaskId::new(id))),
        ..Default::default()
    }))
}

async fn ancestors(State(state): State<AppState>, Path(id): Path<String>) -> Json<Vec<Task>> {
    let scheduler = state.scheduler.lock().await;
    Json(scheduler.tasks().ancestors(&id))
}

async fn subtree(State(state): State<AppState>, Path(id): Path<String>) -> Json<Vec<Task>> {
    let scheduler = state.scheduler.lock().await;
    Json(scheduler.tasks().subtree(&id))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Json<Vec<TaskAuditEntry>> {
    let scheduler = state.scheduler.lock().await;
    Json(scheduler.tasks().history(&id, q.limit.unwrap_or(100)))
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    ids: Vec<String>,
    op: BulkOpRequest,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BulkOpRequest {
    AddTags { tags: Vec<String> },
    RemoveTags { tags: Vec<String> },
    SetStatus { status: String },
    SetPriority { priority: i32 },
    Delete,
}

async fn bulk(
    State(state): State<AppState>,
    Json(req): Json<BulkRequest>,
) -> Result<Json<Vec<Task>>, AppError> {
    let op = match req.op {
        BulkOpRequest::AddTags { tags } => BulkOp::AddTags(tags),
        BulkOpRequest::RemoveTags { tags } => BulkOp::RemoveTags(tags),
        BulkOpRequest::SetStatus { status } => BulkOp::SetStatus(parse_status(&status)?),
        BulkOpRequest::SetPriority { priority } => BulkOp::SetPriority(priority),
        BulkOpRequest::Delete => BulkOp::Delete,
    };
    let scheduler = state.scheduler.lock().await;
    let tasks = scheduler.tasks().bulk(&req.ids, op)?;
    state.wake.notify_one();
    Ok(Json(tasks))
}

#[derive(Serialize)]
struct GrimoireMatchResponse {
    grimoire: String,
    source: &'static str,
    rule_index: Option<usize>,
}

async fn grimoire_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GrimoireMatchResponse>, AppError> {
    let scheduler = state.scheduler.lock().await;
    let task = scheduler
        .tasks()
        .get(&id)
        .ok_or_else(|| AppError::from(coven_core::CovenError::NotFound(id.clone())))?;
    let result = scheduler.match_task(&task);
    let (source, rule_index) = match result.source {
        coven_grimoire::MatchSource::DirectTag => ("direct-tag", None),
        coven_grimoire::MatchSource::Rule(i) => ("rule", Some(i)),
        coven_grimoire::MatchSource::Inherited => ("inherited", None),
        coven_grimoire::MatchSource::Default => ("default", None),
    };
    Ok(Json(GrimoireMatchResponse {
        grimoire: result.grimoire,
        source,
        rule_index,
    }))
}
