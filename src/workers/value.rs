// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::engine::OutputSlot;
use crate::errors::{ResourceError, WorkerError};
use crate::traits::{downcast_worker, Worker};

/// A worker that does nothing but hold a value until it is killed.
///
/// Useful for publishing configuration, clients or handles to dependents:
/// pair it with [`value_output`] so that `ctx.get::<T>(name)` returns a clone.
pub struct ValueWorker<T> {
    value: T,
    done: CancellationToken,
}

impl<T> ValueWorker<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            done: CancellationToken::new(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_killed(&self) -> bool {
        self.done.is_cancelled()
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Worker for ValueWorker<T> {
    fn kill(&self) {
        self.done.cancel();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.done.cancelled().await;
        Ok(())
    }
}

/// Output function for manifolds whose worker is a `ValueWorker<T>`.
pub fn value_output<T: Clone + Send + Sync + 'static>(
) -> impl Fn(&(dyn Worker + 'static), &mut OutputSlot<'_>) -> Result<(), ResourceError> + Send + Sync + 'static
{
    |worker: &(dyn Worker + 'static), slot: &mut OutputSlot<'_>| {
        let Some(worker) = downcast_worker::<ValueWorker<T>>(worker) else {
            return Err(ResourceError::UnsupportedOutput {
                requested: slot.requested(),
            });
        };
        slot.fill(worker.value().clone())
    }
}
