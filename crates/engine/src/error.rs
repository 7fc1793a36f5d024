// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by the task store, workflow engine, scheduler, and question
//! router, on top of the shared [`coven_core::CovenError`] taxonomy.

use coven_adapters::AgentError;
use coven_storage::WalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Coven(#[from] coven_core::CovenError),

    #[error(transparent)]
    Wal(#[from] WalError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("grimoire not found: {0}")]
    GrimoireNotFound(String),

    #[error("workflow engine failure: {0}")]
    StepFailed(String),
}

impl EngineError {
    /// Maps onto the same wire error taxonomy as [`coven_core::CovenError`],
    /// so HTTP handlers can flatten every engine-layer failure to one
    /// `{code, message}` shape regardless of which layer raised it.
    pub fn code(&self) -> coven_core::ErrorCode {
        match self {
            EngineError::Coven(e) => e.code(),
            EngineError::Wal(_) | EngineError::Agent(_) | EngineError::StepFailed(_) => {
                coven_core::ErrorCode::Internal
            }
            EngineError::GrimoireNotFound(_) => coven_core::ErrorCode::GrimoireNotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
