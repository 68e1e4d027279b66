// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Short-lived tasks that run start functions and wait on workers.
//!
//! Supervisors never touch the graph. Each one does a single blocking job
//! and posts the outcome, tagged with the node's generation, back to the
//! scheduler's event queue. The job runs in its own inner task so that a
//! panic arrives as a `JoinError` instead of taking the supervisor down.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::engine::event::Event;
use crate::engine::manifold::StartFn;
use crate::engine::Context;
use crate::traits::Worker;
use crate::utils::panic_message;

/// Run a start function and report the worker it produced.
///
/// If the engine has already gone away, a freshly started worker is killed
/// so that it does not outlive its engine.
pub(crate) fn spawn_start(
    name: String,
    generation: u64,
    start: StartFn,
    ctx: Context,
    events: UnboundedSender<Event>,
) {
    tokio::spawn(async move {
        let outcome = tokio::spawn(async move { start(ctx).await }).await;
        let event = match outcome {
            Ok(result) => Event::StartCompleted {
                name,
                generation,
                result,
            },
            Err(error) => Event::StartPanicked {
                name,
                generation,
                message: panic_message(error),
            },
        };
        if let Err(unsent) = events.send(event) {
            if let Event::StartCompleted {
                result: Ok(worker), ..
            } = unsent.0
            {
                worker.kill();
            }
        }
    });
}

/// Wait for a worker to finish and report how it ended.
pub(crate) fn spawn_wait(
    name: String,
    generation: u64,
    worker: Arc<dyn Worker>,
    events: UnboundedSender<Event>,
) {
    tokio::spawn(async move {
        let outcome = tokio::spawn(async move { worker.wait().await }).await;
        let event = match outcome {
            Ok(result) => Event::WorkerStopped {
                name,
                generation,
                result,
            },
            Err(error) => Event::WaitPanicked {
                name,
                generation,
                message: panic_message(error),
            },
        };
        // a closed queue means the engine is gone and nobody is listening
        let _ = events.send(event);
    });
}
