// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Manifold definitions: what a worker slot needs and how to start it.

use std::any::{type_name, Any};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::Context;
use crate::errors::{ResourceError, WorkerError};
use crate::traits::Worker;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type StartResult = Result<Arc<dyn Worker>, WorkerError>;

/// Type-erased start function.
pub type StartFn = Arc<dyn Fn(Context) -> BoxFuture<'static, StartResult> + Send + Sync>;

/// Type-erased output function. Writes the worker's output into a typed slot.
pub type OutputFn = Arc<
    dyn Fn(&(dyn Worker + 'static), &mut OutputSlot<'_>) -> Result<(), ResourceError>
        + Send
        + Sync,
>;

/// Type-erased error filter.
pub type FilterFn = Arc<dyn Fn(WorkerError) -> WorkerError + Send + Sync>;

/// The declarative description of one worker slot.
///
/// A manifold lists the names it consumes, a start function that builds a
/// worker from a [`Context`], and optionally an output function through which
/// dependents read values out of that worker, plus a filter that rewrites the
/// errors the engine sees from it.
///
/// Manifolds are cheap to clone; every function is shared behind an `Arc`.
///
/// # Example
/// ```
/// use manifold_engine::engine::Manifold;
/// use manifold_engine::errors::WorkerError;
/// use manifold_engine::workers::{value_output, ValueWorker};
///
/// let manifold = Manifold::new(["agent"], |ctx| async move {
///     let address: String = ctx.get("agent")?;
///     Ok::<_, WorkerError>(ValueWorker::new(format!("{}/api", address)))
/// })
/// .with_output(value_output::<String>());
///
/// assert_eq!(manifold.inputs(), ["agent"]);
/// ```
#[derive(Clone)]
pub struct Manifold {
    inputs: Vec<String>,
    start: StartFn,
    output: Option<OutputFn>,
    filter: Option<FilterFn>,
}

impl Manifold {
    /// Create a manifold from a start function returning a concrete worker.
    pub fn new<I, S, F, Fut, W>(inputs: I, start: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<W, WorkerError>> + Send + 'static,
        W: Worker,
    {
        let start: StartFn = Arc::new(move |ctx: Context| -> BoxFuture<'static, StartResult> {
            let started = start(ctx);
            Box::pin(async move {
                let worker = started.await?;
                Ok(Arc::new(worker) as Arc<dyn Worker>)
            })
        });
        Self::from_boxed(inputs, start)
    }

    /// Create a manifold from an already type-erased start function.
    ///
    /// Duplicate input names are collapsed, keeping the first occurrence.
    pub fn from_boxed<I, S>(inputs: I, start: StartFn) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for input in inputs {
            let input = input.into();
            if !unique.contains(&input) {
                unique.push(input);
            }
        }
        Self {
            inputs: unique,
            start,
            output: None,
            filter: None,
        }
    }

    pub fn with_output<F>(mut self, output: F) -> Self
    where
        F: Fn(&(dyn Worker + 'static), &mut OutputSlot<'_>) -> Result<(), ResourceError>
            + Send
            + Sync
            + 'static,
    {
        self.output = Some(Arc::new(output));
        self
    }

    /// Translate every error from this manifold's start function and worker
    /// before the engine acts on it.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(WorkerError) -> WorkerError + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Only start while every named flag manifold reports `true`.
    ///
    /// The flags become inputs of this manifold, so a flag worker that
    /// restarts with a new value restarts this manifold too. While any flag
    /// is unset the start function is not called and the start fails with
    /// [`ResourceError::Unavailable`].
    pub fn gated_by<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let flags: Arc<Vec<String>> = Arc::new(flags.into_iter().map(Into::into).collect());
        for flag in flags.iter() {
            if !self.inputs.contains(flag) {
                self.inputs.push(flag.clone());
            }
        }

        let inner = self.start.clone();
        self.start = Arc::new(move |ctx: Context| -> BoxFuture<'static, StartResult> {
            let inner = inner.clone();
            let flags = flags.clone();
            Box::pin(async move {
                for flag in flags.iter() {
                    if !ctx.get::<bool>(flag)? {
                        return Err(ResourceError::unavailable(flag.as_str()).into());
                    }
                }
                inner(ctx).await
            })
        });
        self
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub(crate) fn start_fn(&self) -> StartFn {
        self.start.clone()
    }

    pub(crate) fn output_fn(&self) -> Option<OutputFn> {
        self.output.clone()
    }

    pub(crate) fn filter_error(&self, error: WorkerError) -> WorkerError {
        match &self.filter {
            Some(filter) => filter(error),
            None => error,
        }
    }
}

impl fmt::Debug for Manifold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manifold")
            .field("inputs", &self.inputs)
            .field("output", &self.output.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// A typed destination an output function writes into.
///
/// The slot is created by [`Context::get`] for the type the caller asked for.
/// Output functions either [`fill`](OutputSlot::fill) it with a value of that
/// type or report that they cannot.
pub struct OutputSlot<'a> {
    target: &'a mut (dyn Any + 'static),
    requested: &'static str,
}

impl<'a> OutputSlot<'a> {
    pub fn new<T: 'static>(target: &'a mut Option<T>) -> Self {
        Self {
            target,
            requested: type_name::<T>(),
        }
    }

    /// True if the caller asked for a `T`.
    pub fn wants<T: 'static>(&self) -> bool {
        self.target.is::<Option<T>>()
    }

    pub fn fill<T: 'static>(&mut self, value: T) -> Result<(), ResourceError> {
        match self.target.downcast_mut::<Option<T>>() {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(ResourceError::UnsupportedOutput {
                requested: self.requested,
            }),
        }
    }

    /// Type name the caller asked for, for error messages.
    pub fn requested(&self) -> &'static str {
        self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::ValueWorker;

    #[test]
    fn test_output_slot_fills_requested_type() {
        let mut value: Option<u32> = None;
        let mut slot = OutputSlot::new(&mut value);

        assert!(slot.wants::<u32>());
        assert!(!slot.wants::<String>());
        slot.fill(42u32).unwrap();

        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_output_slot_rejects_other_types() {
        let mut value: Option<String> = None;
        let mut slot = OutputSlot::new(&mut value);

        let error = slot.fill(1u8).unwrap_err();

        assert_eq!(
            error,
            ResourceError::UnsupportedOutput {
                requested: type_name::<String>()
            }
        );
        assert_eq!(value, None);
    }

    #[test]
    fn test_duplicate_inputs_collapse() {
        let manifold = Manifold::new(["agent", "clock", "agent"], |_ctx| async {
            Ok(ValueWorker::new(()))
        });
        assert_eq!(manifold.inputs(), ["agent", "clock"]);
    }

    #[test]
    fn test_gated_by_adds_flag_inputs() {
        let manifold = Manifold::new(["api-caller"], |_ctx| async { Ok(ValueWorker::new(())) })
            .gated_by(["upgrade-complete", "api-caller"]);
        assert_eq!(manifold.inputs(), ["api-caller", "upgrade-complete"]);
    }

    #[test]
    fn test_filter_rewrites_errors() {
        let manifold = Manifold::new(Vec::<String>::new(), |_ctx| async {
            Ok(ValueWorker::new(()))
        })
        .with_filter(|error| match error {
            WorkerError::Failed(message) if message == "restart me" => WorkerError::Bounce,
            other => other,
        });

        assert_eq!(
            manifold.filter_error(WorkerError::failed("restart me")),
            WorkerError::Bounce
        );
        assert_eq!(
            manifold.filter_error(WorkerError::failed("other")),
            WorkerError::failed("other")
        );
    }
}
