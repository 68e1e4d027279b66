// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The capability contract every engine-managed worker implements.

use std::any::Any;

use async_trait::async_trait;

use crate::errors::WorkerError;

/// Lets output functions recover the concrete type behind a `dyn Worker`.
///
/// Blanket-implemented for every `'static` type, so worker authors never
/// implement it by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A long-running unit of work controlled by the engine.
///
/// `kill` asks the worker to stop and must return promptly; calling it more
/// than once is harmless. `wait` resolves once the worker has fully stopped.
/// It may be called any number of times, and every call returns the same
/// result.
#[async_trait]
pub trait Worker: AsAny + Send + Sync {
    fn kill(&self);

    async fn wait(&self) -> Result<(), WorkerError>;

    /// Optional diagnostic snapshot, included in the engine report.
    fn report(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Narrows a type-erased worker to its concrete type.
pub fn downcast_worker<'a, W: Worker>(worker: &'a (dyn Worker + 'static)) -> Option<&'a W> {
    AsAny::as_any(worker).downcast_ref::<W>()
}
