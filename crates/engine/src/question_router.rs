// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Question Router (spec.md §4.10): turns an agent step's streaming output
//! into a detected [`Question`], holds it until a human answers, and
//! delivers the answer to the running process's stdin.
//!
//! Detection is driven by [`WorkflowRunner`](crate::workflow::WorkflowRunner)
//! as output lines arrive (see `execute_agent_step`'s drain loop); this
//! module only owns the publish-then-deliver half, so it has no dependency
//! on the agent-step execution path itself.

use crate::error::{EngineError, Result};
use crate::event_bus::EventBus;
use coven_adapters::agent::AgentAdapter;
use coven_adapters::question::classify;
use coven_core::{Clock, CovenError, Event, Question, QuestionId, TaskId};

/// Scans `tail` — the most recently accumulated slice of an agent step's
/// output — for a pending question, publishing `QuestionDetected` the first
/// time one is recognized for `step_task_id`. A no-op once a question is
/// already open (undelivered or unanswered) for that step, so calling this
/// on every output line as more text streams in is cheap and idempotent.
pub fn detect<C: Clock>(
    bus: &EventBus,
    clock: &C,
    task_id: &TaskId,
    step_task_id: &str,
    tail: &str,
) -> Result<Option<QuestionId>> {
    let already_open = bus
        .state()
        .lock()
        .questions
        .values()
        .any(|q| q.step_task_id == step_task_id && q.is_pending());
    if already_open {
        return Ok(None);
    }
    let Some(classification) = classify(tail) else {
        return Ok(None);
    };
    let id = QuestionId::new(uuid::Uuid::new_v4().to_string());
    let question = Question {
        id: id.clone(),
        task_id: task_id.clone(),
        step_task_id: step_task_id.to_string(),
        kind: classification.kind,
        text: classification.text,
        options: classification.options,
        detected_at: clock.now(),
        answered_at: None,
        answer: None,
        delivered_at: None,
    };
    bus.publish(vec![Event::QuestionDetected { question }])?;
    Ok(Some(id))
}

/// Records a human answer and delivers it to the agent's stdin.
///
/// Answering an already-answered question returns `answered-already`
/// without touching the process. The answer is recorded durably before
/// delivery is attempted, so a `send_answer` failure (the process already
/// exited) never loses the human's input — it only fails to be used.
pub async fn answer<A: AgentAdapter, C: Clock>(
    bus: &EventBus,
    agents: &A,
    clock: &C,
    question_id: &str,
    answer_text: String,
) -> Result<()> {
    let question = bus
        .state()
        .lock()
        .get_question(question_id)
        .cloned()
        .ok_or_else(|| EngineError::Coven(CovenError::NotFound(question_id.to_string())))?;
    if question.is_answered() {
        return Err(EngineError::Coven(CovenError::AnsweredAlready));
    }

    let answered_at = clock.now();
    bus.publish(vec![Event::QuestionAnswered {
        id: question.id.clone(),
        answer: answer_text.clone(),
        at: answered_at,
    }])?;

    agents
        .send_answer(&question.step_task_id, &question.id, &answer_text)
        .await?;

    bus.publish(vec![Event::QuestionDelivered {
        id: question.id.clone(),
        at: clock.now(),
    }])?;
    Ok(())
}

#[cfg(test)]
#[path = "question_router_tests.rs"]
mod tests;
