// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/agents*` (spec.md §6.2): direct access to a running agent-step process
//! — tailed output, kill, and answering a question by `step_task_id` rather
//! than going through `/questions/{id}/answer`'s detection-driven path.

use super::AppError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use coven_adapters::agent::AgentAdapter;
use coven_core::AgentOutputLine;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/agents/{step_task_id}/output", axum::routing::get(output))
        .route("/agents/{step_task_id}/kill", post(kill))
        .route("/agents/{step_task_id}/respond", post(respond))
}

#[derive(Debug, Deserialize, Default)]
struct OutputQuery {
    since: Option<u64>,
}

async fn output(
    State(state): State<AppState>,
    Path(step_task_id): Path<String>,
    Query(q): Query<OutputQuery>,
) -> Json<Vec<AgentOutputLine>> {
    let scheduler = state.scheduler.lock().await;
    let lines = scheduler.runner().agents().tail(&step_task_id).await;
    let since = q.since.unwrap_or(0);
    Json(lines.into_iter().filter(|l| l.seq > since).collect())
}

async fn kill(
    State(state): State<AppState>,
    Path(step_task_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let scheduler = state.scheduler.lock().await;
    scheduler
        .runner()
        .agents()
        .kill(&step_task_id)
        .await
        .map_err(|e| AppError::from(coven_core::CovenError::Internal(e.to_string())))?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
struct RespondRequest {
    question_id: String,
    answer: String,
}

async fn respond(
    State(state): State<AppState>,
    Path(step_task_id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<StatusCode, AppError> {
    let scheduler = state.scheduler.lock().await;
    scheduler
        .runner()
        .agents()
        .send_answer(
            &step_task_id,
            &coven_core::QuestionId::new(req.question_id),
            &req.answer,
        )
        .await
        .map_err(|e| AppError::from(coven_core::CovenError::Internal(e.to_string())))?;
    Ok(StatusCode::OK)
}
