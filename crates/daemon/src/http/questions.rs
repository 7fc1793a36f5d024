// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/questions*` (spec.md §6.2): answering a question the matcher detected
//! in an agent's output, by question id rather than by raw step task id.

use super::AppError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use coven_core::{Question, SystemClock};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/questions", get(list))
        .route("/questions/{id}", get(get_one))
        .route("/questions/{id}/answer", post(answer))
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    task_id: Option<String>,
    pending: Option<bool>,
}

/// `GET /questions[?task_id|pending=true]` (spec.md §6.2).
async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Json<Vec<Question>> {
    let snapshot = state.bus.snapshot();
    let mut questions: Vec<Question> = snapshot.questions.values().cloned().collect();
    if let Some(task_id) = &q.task_id {
        questions.retain(|q| q.task_id.as_str() == task_id);
    }
    if q.pending.unwrap_or(false) {
        questions.retain(Question::is_pending);
    }
    questions.sort_by(|a, b| a.detected_at.cmp(&b.detected_at));
    Json(questions)
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Question>, AppError> {
    state
        .bus
        .snapshot()
        .get_question(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::from(coven_core::CovenError::NotFound(id)))
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    answer: String,
}

async fn answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<StatusCode, AppError> {
    let scheduler = state.scheduler.lock().await;
    coven_engine::answer_question(
        &state.bus,
        scheduler.runner().agents(),
        &SystemClock,
        &id,
        req.answer,
    )
    .await
    .map_err(AppError::from)?;
    Ok(StatusCode::OK)
}
