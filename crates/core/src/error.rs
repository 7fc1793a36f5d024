// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-readable error taxonomy shared by every component.
//!
//! Every public operation returns `Result<_, CovenError>`. HTTP handlers map
//! [`CovenError::code`] directly onto the `{code, message}` response body.

use thiserror::Error;

/// A stable machine-readable error code, as returned over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    AlreadyClaimed,
    InvalidStatus,
    WouldCreateCycle,
    NotReadyForMerge,
    WorkflowNotInState,
    SpellNotFound,
    TemplateParse,
    TemplateRender,
    TemplateTypeMismatch,
    IncludeDepthExceeded,
    IncludeCycle,
    GrimoireNotFound,
    MatcherInvalid,
    AgentGone,
    StepTimeout,
    WorkflowTimeout,
    WorktreeExists,
    WorktreeMissing,
    MergeConflict,
    AlreadyRunning,
    AnsweredAlready,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not-found",
            ErrorCode::AlreadyClaimed => "already-claimed",
            ErrorCode::InvalidStatus => "invalid-status",
            ErrorCode::WouldCreateCycle => "would-create-cycle",
            ErrorCode::NotReadyForMerge => "not-ready-for-merge",
            ErrorCode::WorkflowNotInState => "workflow-not-in-state",
            ErrorCode::SpellNotFound => "spell-not-found",
            ErrorCode::TemplateParse => "template-parse",
            ErrorCode::TemplateRender => "template-render",
            ErrorCode::TemplateTypeMismatch => "template-type-mismatch",
            ErrorCode::IncludeDepthExceeded => "include-depth-exceeded",
            ErrorCode::IncludeCycle => "include-cycle",
            ErrorCode::GrimoireNotFound => "grimoire-not-found",
            ErrorCode::MatcherInvalid => "matcher-invalid",
            ErrorCode::AgentGone => "agent-gone",
            ErrorCode::StepTimeout => "step-timeout",
            ErrorCode::WorkflowTimeout => "workflow-timeout",
            ErrorCode::WorktreeExists => "worktree-exists",
            ErrorCode::WorktreeMissing => "worktree-missing",
            ErrorCode::MergeConflict => "merge-conflict",
            ErrorCode::AlreadyRunning => "already-running",
            ErrorCode::AnsweredAlready => "answered-already",
            ErrorCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level error type returned by every Coven component.
#[derive(Debug, Error)]
pub enum CovenError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already claimed by {claimant}")]
    AlreadyClaimed { claimant: String },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatus { from: String, to: String },

    #[error("reparenting would create a cycle through {0}")]
    WouldCreateCycle(String),

    #[error("workflow is not ready for merge")]
    NotReadyForMerge,

    #[error("workflow not in expected state: {0}")]
    WorkflowNotInState(String),

    #[error("spell not found: {0}")]
    SpellNotFound(String),

    #[error("template parse error: {0}")]
    TemplateParse(String),

    #[error("template render error: {0}")]
    TemplateRender(String),

    #[error("template condition did not evaluate to a boolean: {0}")]
    TemplateTypeMismatch(String),

    #[error("template include depth exceeded (max 5)")]
    IncludeDepthExceeded,

    #[error("template include cycle detected: {0}")]
    IncludeCycle(String),

    #[error("grimoire not found: {0}")]
    GrimoireNotFound(String),

    #[error("invalid matcher configuration: {0}")]
    MatcherInvalid(String),

    #[error("agent process is gone")]
    AgentGone,

    #[error("step timed out after {0:?}")]
    StepTimeout(std::time::Duration),

    #[error("workflow timed out after {0:?}")]
    WorkflowTimeout(std::time::Duration),

    #[error("worktree already exists: {0}")]
    WorktreeExists(String),

    #[error("worktree missing: {0}")]
    WorktreeMissing(String),

    #[error("merge conflict in: {0:?}")]
    MergeConflict(Vec<String>),

    #[error("daemon already running for this workspace")]
    AlreadyRunning,

    #[error("question already answered")]
    AnsweredAlready,

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CovenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CovenError::NotFound(_) => ErrorCode::NotFound,
            CovenError::AlreadyClaimed { .. } => ErrorCode::AlreadyClaimed,
            CovenError::InvalidStatus { .. } => ErrorCode::InvalidStatus,
            CovenError::WouldCreateCycle(_) => ErrorCode::WouldCreateCycle,
            CovenError::NotReadyForMerge => ErrorCode::NotReadyForMerge,
            CovenError::WorkflowNotInState(_) => ErrorCode::WorkflowNotInState,
            CovenError::SpellNotFound(_) => ErrorCode::SpellNotFound,
            CovenError::TemplateParse(_) => ErrorCode::TemplateParse,
            CovenError::TemplateRender(_) => ErrorCode::TemplateRender,
            CovenError::TemplateTypeMismatch(_) => ErrorCode::TemplateTypeMismatch,
            CovenError::IncludeDepthExceeded => ErrorCode::IncludeDepthExceeded,
            CovenError::IncludeCycle(_) => ErrorCode::IncludeCycle,
            CovenError::GrimoireNotFound(_) => ErrorCode::GrimoireNotFound,
            CovenError::MatcherInvalid(_) => ErrorCode::MatcherInvalid,
            CovenError::AgentGone => ErrorCode::AgentGone,
            CovenError::StepTimeout(_) => ErrorCode::StepTimeout,
            CovenError::WorkflowTimeout(_) => ErrorCode::WorkflowTimeout,
            CovenError::WorktreeExists(_) => ErrorCode::WorktreeExists,
            CovenError::WorktreeMissing(_) => ErrorCode::WorktreeMissing,
            CovenError::MergeConflict(_) => ErrorCode::MergeConflict,
            CovenError::AlreadyRunning => ErrorCode::AlreadyRunning,
            CovenError::AnsweredAlready => ErrorCode::AnsweredAlready,
            CovenError::Internal(_) | CovenError::Io(_) => ErrorCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, CovenError>;
