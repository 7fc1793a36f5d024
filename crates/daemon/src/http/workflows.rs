// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/workflows*` (spec.md §6.2): read access to workflow state plus the
//! human-in-the-loop actions — cancel, retry, and merge-review decisions —
//! that `WorkflowRunner` doesn't reach on its own reconciliation path.

use super::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use coven_core::{Grimoire, WorkflowId, WorkflowState};
use serde::Deserialize;
use std::fs;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workflows", get(list))
        .route("/workflows/{id}", get(get_one))
        .route("/workflows/{id}/log", get(log))
        .route("/workflows/{id}/cancel", post(cancel))
        .route("/workflows/{id}/retry", post(retry))
        .route("/workflows/{id}/approve-merge", post(approve_merge))
        .route("/workflows/{id}/reject-merge", post(reject_merge))
}

async fn list(State(state): State<AppState>) -> Json<Vec<WorkflowState>> {
    let snapshot = state.bus.snapshot();
    let mut workflows: Vec<_> = snapshot.workflows.values().cloned().collect();
    workflows.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Json(workflows)
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowState>, AppError> {
    state
        .bus
        .snapshot()
        .get_workflow(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::from(coven_core::CovenError::NotFound(id)))
}

/// The durable JSONL workflow log (spec.md §6.1:
/// `.coven/logs/workflows/<id>.jsonl`), one line per transition, written
/// independently of `/events` so history survives after the SSE connection
/// that observed it closes.
async fn log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, AppError> {
    let path = state.config.workflow_logs_dir.join(format!("{id}.jsonl"));
    fs::read_to_string(&path)
        .map_err(|_| AppError::from(coven_core::CovenError::NotFound(id)))
}

#[derive(Debug, Deserialize, Default)]
struct ReasonRequest {
    reason: Option<String>,
}

async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReasonRequest>,
) -> Result<StatusCode, AppError> {
    let scheduler = state.scheduler.lock().await;
    scheduler
        .runner()
        .cancel(&WorkflowId::new(id), req.reason)
        .map_err(AppError::from)?;
    Ok(StatusCode::ACCEPTED)
}

/// Re-runs a blocked or failed workflow from its last completed step.
/// `WorkflowRunner::run` already resumes from `current_step`, so retry is
/// just re-entering `run` after flipping status back to running.
async fn retry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let workflow_id = WorkflowId::new(id);
    let scheduler = state.scheduler.lock().await;
    let workflow = state
        .bus
        .snapshot()
        .get_workflow(workflow_id.as_str())
        .cloned()
        .ok_or_else(|| AppError::from(coven_core::CovenError::NotFound(workflow_id.to_string())))?;
    if !matches!(
        workflow.status,
        coven_core::WorkflowStatus::Blocked | coven_core::WorkflowStatus::Failed
    ) {
        return Err(AppError::from(coven_core::CovenError::WorkflowNotInState(
            "blocked or failed".to_string(),
        )));
    }
    let grimoire: Grimoire = scheduler
        .grimoires()
        .get(&workflow.grimoire_name)
        .cloned()
        .ok_or_else(|| AppError::from(coven_core::CovenError::GrimoireNotFound(workflow.grimoire_name.clone())))?;

    let at = chrono::Utc::now();
    state
        .bus
        .publish(vec![coven_core::Event::WorkflowTransitioned {
            workflow_id: workflow_id.clone(),
            status: coven_core::WorkflowStatus::Running,
            error: None,
            at,
        }])
        .map_err(|e| AppError::from(coven_core::CovenError::Internal(e.to_string())))?;

    let runner = scheduler.runner().clone();
    let spells = scheduler.spells().clone();
    tokio::spawn(async move {
        if let Err(err) = runner.run(&workflow_id, &grimoire, &spells).await {
            tracing::error!(workflow_id = %workflow_id, "retried workflow run failed: {err}");
        }
    });
    Ok(StatusCode::ACCEPTED)
}

async fn approve_merge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReasonRequest>,
) -> Result<StatusCode, AppError> {
    let workflow_id = WorkflowId::new(id);
    let scheduler = state.scheduler.lock().await;
    scheduler
        .runner()
        .approve_merge(&workflow_id, true, req.reason)
        .await
        .map_err(AppError::from)?;
    // Approval only records the decision and performs the git merge; the
    // merge step itself only completes once `run` walks back into it and
    // sees `merge_review.decided_at` set, the same way `retry` re-enters a
    // blocked workflow.
    resume_run(&state, &scheduler, workflow_id).await?;
    Ok(StatusCode::OK)
}

async fn reject_merge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReasonRequest>,
) -> Result<StatusCode, AppError> {
    let scheduler = state.scheduler.lock().await;
    scheduler
        .runner()
        .approve_merge(&WorkflowId::new(id), false, req.reason)
        .await
        .map_err(AppError::from)?;
    Ok(StatusCode::OK)
}

/// Spawns a continuation of an in-flight workflow run, the same
/// fire-and-forget shape `retry` uses. Only needed after an approval: the
/// rejection path already lands the workflow on a terminal `Blocked`
/// status via the `WorkflowMergeReviewDecided` event itself.
async fn resume_run(
    state: &AppState,
    scheduler: &tokio::sync::MutexGuard<'_, crate::lifecycle::CovenScheduler>,
    workflow_id: WorkflowId,
) -> Result<(), AppError> {
    let workflow = state
        .bus
        .snapshot()
        .get_workflow(workflow_id.as_str())
        .cloned()
        .ok_or_else(|| AppError::from(coven_core::CovenError::NotFound(workflow_id.to_string())))?;
    let grimoire: Grimoire = scheduler
        .grimoires()
        .get(&workflow.grimoire_name)
        .cloned()
        .ok_or_else(|| {
            AppError::from(coven_core::CovenError::GrimoireNotFound(
                workflow.grimoire_name.clone(),
            ))
        })?;
    let runner = scheduler.runner().clone();
    let spells = scheduler.spells().clone();
    tokio::spawn(async move {
        if let Err(err) = runner.run(&workflow_id, &grimoire, &spells).await {
            tracing::error!(workflow_id = %workflow_id, "resumed workflow run failed: {err}");
        }
    });
    Ok(())
}
