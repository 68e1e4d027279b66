// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::manifold::{OutputFn, OutputSlot};
use crate::errors::ResourceError;
use crate::observability::messages::node::ResourceRefused;
use crate::observability::messages::StructuredLog;
use crate::traits::Worker;

/// A running input as seen from a dependent's start function.
#[derive(Clone)]
pub(crate) struct Resource {
    pub worker: Arc<dyn Worker>,
    pub output: Option<OutputFn>,
}

/// The view of the engine handed to a start function.
///
/// The context is a snapshot taken when the start attempt is launched: it
/// holds every declared input that was running at that moment and never
/// blocks waiting for one to appear. A start function that cannot find what
/// it needs should fail fast and let the engine try again later.
///
/// The abort token fires when the engine no longer wants this worker, either
/// because an input went away or because the engine is shutting down. Start
/// functions that do slow setup should select on [`Context::aborted`].
#[derive(Clone)]
pub struct Context {
    name: String,
    resources: BTreeMap<String, Option<Resource>>,
    abort: CancellationToken,
}

impl Context {
    pub(crate) fn new(
        name: String,
        resources: BTreeMap<String, Option<Resource>>,
        abort: CancellationToken,
    ) -> Self {
        Self {
            name,
            resources,
            abort,
        }
    }

    /// Name of the manifold being started.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared input names, in name order.
    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn abort(&self) -> &CancellationToken {
        &self.abort
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    /// Resolves once this start attempt has been abandoned.
    pub async fn aborted(&self) {
        self.abort.cancelled().await
    }

    /// Check that a declared input is running, without reading any output.
    pub fn require(&self, name: &str) -> Result<(), ResourceError> {
        self.resource(name).map(|_| ())
    }

    /// Read the output of a declared input as a `T`.
    ///
    /// # Errors
    /// * [`ResourceError::Missing`] - `name` is not a declared input
    /// * [`ResourceError::Unavailable`] - the input is not running, has no
    ///   output function, or cannot provide a `T`
    pub fn get<T: 'static>(&self, name: &str) -> Result<T, ResourceError> {
        let resource = self.resource(name)?;
        let Some(output) = &resource.output else {
            return Err(self.refuse(name, ResourceError::unavailable(name)));
        };

        let mut value: Option<T> = None;
        let mut slot = OutputSlot::new(&mut value);
        if let Err(error) = output(resource.worker.as_ref(), &mut slot) {
            return Err(self.refuse(name, error));
        }
        value.ok_or_else(|| ResourceError::unavailable(name))
    }

    fn resource(&self, name: &str) -> Result<&Resource, ResourceError> {
        match self.resources.get(name) {
            None => Err(self.refuse(name, ResourceError::missing(name))),
            Some(None) => Err(ResourceError::unavailable(name)),
            Some(Some(resource)) => Ok(resource),
        }
    }

    /// Log why a lookup failed and convert it to what the caller sees.
    fn refuse(&self, name: &str, reason: ResourceError) -> ResourceError {
        ResourceRefused {
            name: &self.name,
            resource: name,
            reason: &reason,
        }
        .log();
        match reason {
            ResourceError::Missing { .. } => reason,
            _ => ResourceError::unavailable(name),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let running: Vec<&str> = self
            .resources
            .iter()
            .filter(|(_, resource)| resource.is_some())
            .map(|(name, _)| name.as_str())
            .collect();
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("running_inputs", &running)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::{flag_output, value_output, FlagWorker, ValueWorker};

    fn resource<W: Worker>(worker: W, output: Option<OutputFn>) -> Option<Resource> {
        Some(Resource {
            worker: Arc::new(worker),
            output,
        })
    }

    fn context() -> Context {
        let mut resources = BTreeMap::new();
        resources.insert(
            "api-caller".to_string(),
            resource(
                ValueWorker::new("10.0.0.1:17070".to_string()),
                Some(Arc::new(value_output::<String>())),
            ),
        );
        resources.insert(
            "upgraded".to_string(),
            resource(FlagWorker::new(true), Some(Arc::new(flag_output::<FlagWorker>()))),
        );
        resources.insert(
            "clock".to_string(),
            resource(ValueWorker::new(5u64), None),
        );
        resources.insert("agent".to_string(), None);
        Context::new("machiner".to_string(), resources, CancellationToken::new())
    }

    #[test]
    fn test_get_reads_typed_output() {
        let ctx = context();
        let address: String = ctx.get("api-caller").unwrap();
        assert_eq!(address, "10.0.0.1:17070");
        assert!(ctx.get::<bool>("upgraded").unwrap());
    }

    #[test]
    fn test_get_undeclared_is_missing() {
        let ctx = context();
        assert_eq!(
            ctx.get::<String>("provisioner"),
            Err(ResourceError::missing("provisioner"))
        );
        assert_eq!(
            ctx.require("provisioner"),
            Err(ResourceError::missing("provisioner"))
        );
    }

    #[test]
    fn test_get_stopped_input_is_unavailable() {
        let ctx = context();
        assert_eq!(
            ctx.get::<String>("agent"),
            Err(ResourceError::unavailable("agent"))
        );
        assert_eq!(ctx.require("agent"), Err(ResourceError::unavailable("agent")));
    }

    #[test]
    fn test_get_without_output_function_is_unavailable() {
        let ctx = context();
        assert!(ctx.require("clock").is_ok());
        assert_eq!(
            ctx.get::<u64>("clock"),
            Err(ResourceError::unavailable("clock"))
        );
    }

    #[test]
    fn test_get_wrong_type_is_unavailable() {
        let ctx = context();
        assert_eq!(
            ctx.get::<u32>("api-caller"),
            Err(ResourceError::unavailable("api-caller"))
        );
    }

    #[test]
    fn test_abort_is_observable() {
        let ctx = context();
        assert!(!ctx.is_aborted());
        ctx.abort().cancel();
        assert!(ctx.is_aborted());
        assert_eq!(
            ctx.inputs().collect::<Vec<_>>(),
            vec!["agent", "api-caller", "clock", "upgraded"]
        );
    }
}
