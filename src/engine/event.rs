// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::engine::report::EngineReport;
use crate::engine::Manifold;
use crate::errors::{EngineError, WorkerError};
use crate::traits::Worker;

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Everything the scheduler loop reacts to, from callers and from supervisors.
pub(crate) enum Event {
    Install {
        name: String,
        manifold: Manifold,
        reply: Reply<Result<(), EngineError>>,
    },
    Uninstall {
        name: String,
        reply: Reply<Result<(), EngineError>>,
    },
    Report {
        reply: Reply<EngineReport>,
    },
    StartCompleted {
        name: String,
        generation: u64,
        result: Result<Arc<dyn Worker>, WorkerError>,
    },
    StartPanicked {
        name: String,
        generation: u64,
        message: String,
    },
    WorkerStopped {
        name: String,
        generation: u64,
        result: Result<(), WorkerError>,
    },
    WaitPanicked {
        name: String,
        generation: u64,
        message: String,
    },
    RetryDue {
        name: String,
        epoch: u64,
    },
}
