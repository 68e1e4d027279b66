// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-node lifecycle transitions.
//!
//! Every message carries the manifold name and, where it matters, the start
//! generation so interleaved restarts can be told apart in the logs.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A start function was launched for a node.
///
/// # Log Level
/// `debug!` - Diagnostic detail
///
/// # Example
/// ```
/// use manifold_engine::observability::messages::node::NodeStarting;
/// use manifold_engine::observability::messages::StructuredLog;
///
/// let inputs = vec!["agent".to_string()];
/// let msg = NodeStarting {
///     name: "api-caller",
///     generation: 1,
///     inputs: &inputs,
/// };
///
/// msg.log();
/// ```
pub struct NodeStarting<'a> {
    pub name: &'a str,
    pub generation: u64,
    pub inputs: &'a [String],
}

impl Display for NodeStarting<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting '{}' (generation {}, {} inputs)",
            self.name,
            self.generation,
            self.inputs.len()
        )
    }
}

impl StructuredLog for NodeStarting<'_> {
    fn log(&self) {
        tracing::debug!(
            manifold = self.name,
            generation = self.generation,
            inputs = %self.inputs.join(","),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "node_start",
            span_name = name,
            manifold = self.name,
            generation = self.generation,
        )
    }
}

/// A start function returned a worker.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NodeStarted<'a> {
    pub name: &'a str,
    pub generation: u64,
}

impl Display for NodeStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Started '{}' (generation {})", self.name, self.generation)
    }
}

impl StructuredLog for NodeStarted<'_> {
    fn log(&self) {
        tracing::info!(manifold = self.name, generation = self.generation, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "node_started",
            span_name = name,
            manifold = self.name,
            generation = self.generation,
        )
    }
}

/// A start function failed.
///
/// # Log Level
/// `warn!` - Recoverable, the node is retried or waits for its inputs
pub struct NodeStartFailed<'a> {
    pub name: &'a str,
    pub generation: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for NodeStartFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Start of '{}' failed (generation {}): {}",
            self.name, self.generation, self.error
        )
    }
}

impl StructuredLog for NodeStartFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            manifold = self.name,
            generation = self.generation,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "node_start_failed",
            span_name = name,
            manifold = self.name,
            error = %self.error,
        )
    }
}

/// A node was asked to stop, together with everything that depends on it.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct NodeStopping<'a> {
    pub name: &'a str,
    pub reason: &'a str,
    pub dependents: &'a [String],
}

impl Display for NodeStopping<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.dependents.is_empty() {
            write!(f, "Stopping '{}' ({})", self.name, self.reason)
        } else {
            write!(
                f,
                "Stopping '{}' ({}), cascading to {}",
                self.name,
                self.reason,
                self.dependents.join(", ")
            )
        }
    }
}

impl StructuredLog for NodeStopping<'_> {
    fn log(&self) {
        tracing::debug!(
            manifold = self.name,
            reason = self.reason,
            dependent_count = self.dependents.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "node_stopping",
            span_name = name,
            manifold = self.name,
            reason = self.reason,
        )
    }
}

/// A worker exited and its node is now Stopped.
///
/// # Log Level
/// `info!` for a clean exit, `warn!` when the worker reported an error
pub struct NodeStopped<'a> {
    pub name: &'a str,
    pub generation: u64,
    pub requested: bool,
    pub error: Option<&'a dyn std::error::Error>,
}

impl Display for NodeStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let how = if self.requested { "stopped" } else { "exited" };
        match self.error {
            Some(error) => write!(
                f,
                "Worker '{}' {} with error (generation {}): {}",
                self.name, how, self.generation, error
            ),
            None => write!(
                f,
                "Worker '{}' {} (generation {})",
                self.name, how, self.generation
            ),
        }
    }
}

impl StructuredLog for NodeStopped<'_> {
    fn log(&self) {
        match self.error {
            Some(error) => tracing::warn!(
                manifold = self.name,
                generation = self.generation,
                requested = self.requested,
                error = %error,
                "{}", self
            ),
            None => tracing::info!(
                manifold = self.name,
                generation = self.generation,
                requested = self.requested,
                "{}", self
            ),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "node_stopped",
            span_name = name,
            manifold = self.name,
            generation = self.generation,
        )
    }
}

/// A restart was scheduled after a delay.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use manifold_engine::observability::messages::node::RetryScheduled;
/// use std::time::Duration;
///
/// let msg = RetryScheduled {
///     name: "machiner",
///     failures: 3,
///     delay: Duration::from_secs(12),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RetryScheduled<'a> {
    pub name: &'a str,
    pub failures: u32,
    pub delay: Duration,
}

impl Display for RetryScheduled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Restarting '{}' in {:?} (consecutive failures: {})",
            self.name, self.delay, self.failures
        )
    }
}

impl StructuredLog for RetryScheduled<'_> {
    fn log(&self) {
        tracing::info!(
            manifold = self.name,
            failures = self.failures,
            delay_ms = self.delay.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "retry_scheduled",
            span_name = name,
            manifold = self.name,
            failures = self.failures,
        )
    }
}

/// An event from an earlier generation arrived after the node moved on.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct StaleEventIgnored<'a> {
    pub name: &'a str,
    pub event: &'static str,
    pub event_generation: u64,
    pub current_generation: Option<u64>,
}

impl Display for StaleEventIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.current_generation {
            Some(current) => write!(
                f,
                "Ignoring {} for '{}': generation {} is stale (current {})",
                self.event, self.name, self.event_generation, current
            ),
            None => write!(
                f,
                "Ignoring {} for '{}': manifold no longer installed",
                self.event, self.name
            ),
        }
    }
}

impl StructuredLog for StaleEventIgnored<'_> {
    fn log(&self) {
        tracing::debug!(
            manifold = self.name,
            event = self.event,
            event_generation = self.event_generation,
            current_generation = ?self.current_generation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("stale_event", span_name = name, manifold = self.name)
    }
}

/// A start function asked for a resource it could not have.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ResourceRefused<'a> {
    pub name: &'a str,
    pub resource: &'a str,
    pub reason: &'a dyn std::error::Error,
}

impl Display for ResourceRefused<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "'{}' asked for '{}': {}",
            self.name, self.resource, self.reason
        )
    }
}

impl StructuredLog for ResourceRefused<'_> {
    fn log(&self) {
        tracing::debug!(
            manifold = self.name,
            resource = self.resource,
            reason = %self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "resource_refused",
            span_name = name,
            manifold = self.name,
            resource = self.resource,
        )
    }
}
