// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::{join_validation_errors, ValidationError, WorkerError};

/// Errors reported by the engine itself, either to an `install`/`uninstall`
/// caller or as the final result of `Engine::wait`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("manifold name must not be empty")]
    EmptyName,

    #[error("engine is shutting down")]
    Dying,

    #[error("engine has stopped")]
    Stopped,

    #[error("manifold '{0}' is not installed")]
    NotInstalled(String),

    #[error("cannot install manifold '{name}': {reason}")]
    InvalidManifold {
        name: String,
        reason: ValidationError,
    },

    #[error("invalid engine configuration: {}", join_validation_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("manifold '{name}' failed fatally: {error}")]
    Fatal { name: String, error: WorkerError },

    #[error("start function for '{name}' panicked: {message}")]
    StartPanicked { name: String, message: String },

    #[error("worker '{name}' panicked while being waited on: {message}")]
    WaitPanicked { name: String, message: String },

    #[error("shutdown timed out waiting for: {}", .pending.join(", "))]
    ShutdownTimeout { pending: Vec<String> },
}
