// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors produced by start functions and running workers.
//!
//! Most variants are ordinary failures that the engine retries with backoff.
//! A few carry instructions for the engine instead:
//!
//! * [`WorkerError::Bounce`] - restart promptly, without counting a failure
//! * [`WorkerError::Uninstall`] - remove the manifold from the engine
//! * [`WorkerError::Fatal`] - stop the whole engine and report this error

use thiserror::Error;

use crate::errors::ResourceError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("worker requested a restart")]
    Bounce,

    #[error("manifold requested its own removal")]
    Uninstall,

    #[error("fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("{0}")]
    Failed(String),
}

impl WorkerError {
    pub fn failed(message: impl std::fmt::Display) -> Self {
        WorkerError::Failed(message.to_string())
    }

    pub fn fatal(message: impl std::fmt::Display) -> Self {
        WorkerError::Fatal(message.to_string())
    }
}

impl From<anyhow::Error> for WorkerError {
    fn from(error: anyhow::Error) -> Self {
        WorkerError::Failed(format!("{:#}", error))
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(error: std::io::Error) -> Self {
        WorkerError::Failed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_context_is_preserved() {
        let error = anyhow::anyhow!("connection refused").context("dialing api");
        let worker_error = WorkerError::from(error);
        assert_eq!(
            worker_error,
            WorkerError::Failed("dialing api: connection refused".to_string())
        );
    }

    #[test]
    fn test_resource_errors_are_transparent() {
        let error: WorkerError = ResourceError::unavailable("api-caller").into();
        assert_eq!(error.to_string(), "resource 'api-caller' is unavailable");
    }
}
