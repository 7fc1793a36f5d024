// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification dispatch. `coven_adapters::notify::NotifyAdapter`
//! requires `Clone` and so isn't object-safe — picking between "desktop"
//! and "silent" at runtime (the `COVEN_NO_NOTIFY` env var) needs a concrete
//! enum instead of `Box<dyn NotifyAdapter>`.
//!
//! The workflow engine has no notifier hook of its own (spec.md §4.7), so
//! notifications are wired here as an independent task subscribed to the
//! event bus rather than threaded through `WorkflowRunner`.

use coven_adapters::notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError};
use coven_core::{Event, WorkflowStatus};
use coven_engine::EventBus;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

#[derive(Clone)]
pub enum Notifier {
    Desktop(DesktopNotifyAdapter),
    Silent(NoOpNotifyAdapter),
}

impl Notifier {
    pub fn from_env() -> Self {
        if std::env::var_os("COVEN_NO_NOTIFY").is_some() {
            Notifier::Silent(NoOpNotifyAdapter::new())
        } else {
            Notifier::Desktop(DesktopNotifyAdapter::new())
        }
    }

    pub async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        match self {
            Notifier::Desktop(n) => n.notify(title, message).await,
            Notifier::Silent(n) => n.notify(title, message).await,
        }
    }
}

/// Runs until the bus's broadcast channel closes (daemon shutdown), firing a
/// notification on every transition a human waiting on a task cares about:
/// blocked, completed, failed, merge review requested, or a question asked.
pub async fn run(bus: EventBus, notifier: Notifier) {
    let mut rx = bus.subscribe();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };
        let (title, message) = match &event {
            Event::WorkflowTransitioned {
                workflow_id,
                status: WorkflowStatus::Blocked,
                error,
                ..
            } => (
                "Coven: workflow blocked".to_string(),
                match error {
                    Some(e) => format!("{workflow_id} needs attention: {e}"),
                    None => format!("{workflow_id} needs attention"),
                },
            ),
            Event::WorkflowTransitioned {
                workflow_id,
                status: WorkflowStatus::Completed,
                ..
            } => (
                "Coven: workflow completed".to_string(),
                format!("{workflow_id} finished"),
            ),
            Event::WorkflowTransitioned {
                workflow_id,
                status: WorkflowStatus::Failed,
                error,
                ..
            } => (
                "Coven: workflow failed".to_string(),
                match error {
                    Some(e) => format!("{workflow_id} failed: {e}"),
                    None => format!("{workflow_id} failed"),
                },
            ),
            Event::WorkflowMergeReviewRequested { workflow_id, .. } => (
                "Coven: merge review requested".to_string(),
                format!("{workflow_id} is ready to merge"),
            ),
            Event::QuestionDetected { question } => (
                "Coven: agent has a question".to_string(),
                question.text.clone(),
            ),
            _ => continue,
        };
        if let Err(err) = notifier.notify(&title, &message).await {
            warn!("notification failed: {err}");
        }
    }
}
