// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/session*` (spec.md §6.2): pause and resume the scheduler's
//! reconciliation loop without stopping the daemon. Modeled as a plain
//! `AtomicBool` flip rather than a durable event — pausing is a transient
//! operator action, not part of the task/workflow history.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::atomic::Ordering;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session/start", post(start))
        .route("/session/stop", post(stop))
        .route("/session/status", axum::routing::get(status))
}

#[derive(Serialize)]
struct SessionStatus {
    paused: bool,
    uptime_secs: u64,
}

async fn start(State(state): State<AppState>) -> StatusCode {
    state.paused.store(false, Ordering::Relaxed);
    state.wake.notify_one();
    StatusCode::OK
}

async fn stop(State(state): State<AppState>) -> StatusCode {
    state.paused.store(true, Ordering::Relaxed);
    StatusCode::OK
}

async fn status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(SessionStatus {
        paused: state.paused.load(Ordering::Relaxed),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
