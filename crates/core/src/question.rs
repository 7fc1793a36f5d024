// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Question: an interactive prompt detected in an agent's output, held until answered.

use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    #[derive(Default)]
    pub struct QuestionId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Confirmation,
    Choice,
    Input,
    Permission,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub task_id: TaskId,
    /// Step-scoped identity used to route the answer to the right process's stdin.
    pub step_task_id: String,
    pub kind: QuestionType,
    pub text: String,
    pub options: Option<Vec<String>>,
    pub detected_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub answer: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn is_answered(&self) -> bool {
        self.answered_at.is_some()
    }

    pub fn is_pending(&self) -> bool {
        !self.is_answered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_until_answered() {
        let q = Question {
            id: QuestionId::new("q1"),
            task_id: TaskId::new("T1"),
            step_task_id: "T1.0".into(),
            kind: QuestionType::Confirmation,
            text: "Proceed? (y/n)".into(),
            options: Some(vec!["y".into(), "n".into()]),
            detected_at: Utc::now(),
            answered_at: None,
            answer: None,
            delivered_at: None,
        };
        assert!(q.is_pending());
    }
}
