// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/SSE transport (spec.md §6.2), served over a Unix domain socket.
//! Grounded on `examples/ohitslaurence-agent-loop`'s `loopd` crate — the one
//! pack repo actually shaped "axum daemon, thin HTTP client" the way Coven
//! needs, unlike the teacher's own custom line protocol.

mod agents;
mod questions;
mod session;
mod tasks;
mod workflows;

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coven_core::{CovenError, ErrorCode};
use coven_engine::EngineError;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/shutdown", post(shutdown))
        .route("/state", get(state_summary))
        .route("/events", get(events))
        .merge(tasks::router())
        .merge(workflows::router())
        .merge(agents::router())
        .merge(questions::router())
        .merge(session::router())
        .with_state(state)
}

/// `{code, message}` wire shape every error response shares (spec.md §7).
pub struct AppError(CovenError);

impl From<CovenError> for AppError {
    fn from(e: CovenError) -> Self {
        AppError(e)
    }
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Coven(e) => AppError(e),
            other => AppError(CovenError::Internal(other.to_string())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = status_for(code);
        let body = json!({
            "code": code.as_str(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound
        | ErrorCode::SpellNotFound
        | ErrorCode::GrimoireNotFound
        | ErrorCode::WorktreeMissing => StatusCode::NOT_FOUND,
        ErrorCode::AlreadyClaimed
        | ErrorCode::InvalidStatus
        | ErrorCode::WouldCreateCycle
        | ErrorCode::NotReadyForMerge
        | ErrorCode::WorkflowNotInState
        | ErrorCode::WorktreeExists
        | ErrorCode::MergeConflict
        | ErrorCode::AlreadyRunning
        | ErrorCode::AnsweredAlready
        | ErrorCode::AgentGone => StatusCode::CONFLICT,
        ErrorCode::TemplateParse
        | ErrorCode::TemplateRender
        | ErrorCode::TemplateTypeMismatch
        | ErrorCode::IncludeDepthExceeded
        | ErrorCode::IncludeCycle
        | ErrorCode::MatcherInvalid => StatusCode::BAD_REQUEST,
        ErrorCode::StepTimeout | ErrorCode::WorkflowTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Begins graceful shutdown (spec.md §4.8): flips the watch channel the
/// daemon's main task is selecting on, which stops the HTTP listener and
/// scheduler loop and runs the rest of the shutdown sequence.
async fn shutdown(State(state): State<AppState>) -> StatusCode {
    let _ = state.shutdown_tx.send(true);
    StatusCode::ACCEPTED
}

#[derive(Serialize)]
struct StateSummary {
    workspace: String,
    uptime_secs: u64,
    paused: bool,
    task_count: usize,
    running_workflow_count: usize,
}

async fn state_summary(State(state): State<AppState>) -> Json<StateSummary> {
    let snapshot = state.bus.snapshot();
    Json(StateSummary {
        workspace: state.config.workspace_name(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        paused: state.paused.load(std::sync::atomic::Ordering::Relaxed),
        task_count: snapshot.tasks.len(),
        running_workflow_count: snapshot
            .workflows
            .values()
            .filter(|w| w.status == coven_core::WorkflowStatus::Running)
            .count(),
    })
}

/// Server-sent events: every durable event plus a 30s heartbeat snapshot,
/// for clients that don't want to poll `/state` (spec.md §6.2).
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.bus.subscribe();
    let bus = state.bus.clone();
    let event_stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|msg| msg.ok())
        .map(|event| {
            let kind = event_kind(&event);
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "null".to_string());
            Ok(SseEvent::default().event(kind).data(data))
        });

    let heartbeat = tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(
        Duration::from_secs(30),
    ))
    .map(move |_| {
        let snapshot = bus.snapshot();
        let data = json!({
            "task_count": snapshot.tasks.len(),
            "workflow_count": snapshot.workflows.len(),
        })
        .to_string();
        Ok(SseEvent::default().event("state.snapshot").data(data))
    });

    Sse::new(event_stream.merge(heartbeat)).keep_alive(KeepAlive::default())
}

/// Maps a durable event onto the SSE `event:` type catalog (spec.md §6.2).
fn event_kind(event: &coven_core::Event) -> &'static str {
    use coven_core::Event;
    match event {
        Event::TaskCreated { .. }
        | Event::TaskFieldsUpdated { .. }
        | Event::TaskTagsChanged { .. }
        | Event::TaskReparented { .. }
        | Event::TaskClaimed { .. }
        | Event::TaskReclaimed { .. }
        | Event::TaskReleased { .. }
        | Event::TaskStatusChanged { .. }
        | Event::TaskDeleted { .. }
        | Event::TaskPurged { .. }
        | Event::TaskAuditAppended { .. } => "tasks.changed",
        Event::WorktreeCreated { .. }
        | Event::WorktreeRemoved { .. }
        | Event::WorktreeOrphanRecovered { .. } => "tasks.changed",
        Event::WorkflowStarted { .. } => "workflow.started",
        Event::WorkflowStepStarted { .. } => "workflow.step.started",
        Event::WorkflowStepCompleted { .. } | Event::WorkflowStepAdvanced { .. } => {
            "workflow.step.completed"
        }
        Event::WorkflowLoopIteration { .. } => "workflow.step.completed",
        Event::WorkflowTransitioned { status, .. } => match status {
            coven_core::WorkflowStatus::Blocked => "workflow.blocked",
            coven_core::WorkflowStatus::Completed => "workflow.completed",
            _ => "workflow.completed",
        },
        Event::WorkflowMergeReviewRequested { .. } => "workflow.merge_pending",
        Event::WorkflowMergeReviewDecided { .. } | Event::WorkflowRetired { .. } => {
            "workflow.completed"
        }
        Event::QuestionDetected { .. } => "agent.question",
        Event::QuestionAnswered { .. } | Event::QuestionDelivered { .. } => "agent.question",
    }
}
