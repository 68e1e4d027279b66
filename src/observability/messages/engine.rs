// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for engine lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Engine startup and configuration
//! * Manifold install, replace and uninstall requests
//! * Shutdown, shutdown timeouts and fatal errors

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Engine scheduler loop started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use manifold_engine::observability::messages::engine::EngineStarted;
/// use std::time::Duration;
///
/// let msg = EngineStarted {
///     error_delay: Duration::from_secs(3),
///     max_delay: Duration::from_secs(120),
///     max_concurrent_starts: None,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct EngineStarted {
    pub error_delay: Duration,
    pub max_delay: Duration,
    pub max_concurrent_starts: Option<usize>,
}

impl Display for EngineStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dependency engine started: error_delay={:?}, max_delay={:?}, max_concurrent_starts={}",
            self.error_delay,
            self.max_delay,
            self.max_concurrent_starts
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        )
    }
}

impl StructuredLog for EngineStarted {
    fn log(&self) {
        tracing::info!(
            error_delay_ms = self.error_delay.as_millis() as u64,
            max_delay_ms = self.max_delay.as_millis() as u64,
            max_concurrent_starts = ?self.max_concurrent_starts,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "engine",
            span_name = name,
            error_delay = ?self.error_delay,
            max_delay = ?self.max_delay,
        )
    }
}

/// Engine began shutting down.
///
/// # Log Level
/// `info!` - Important operational event
pub struct EngineShutdownStarted<'a> {
    pub reason: &'a str,
    pub node_count: usize,
    pub timeout: Duration,
}

impl Display for EngineShutdownStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dependency engine stopping ({}): {} nodes, timeout {:?}",
            self.reason, self.node_count, self.timeout
        )
    }
}

impl StructuredLog for EngineShutdownStarted<'_> {
    fn log(&self) {
        tracing::info!(
            reason = self.reason,
            node_count = self.node_count,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "engine_shutdown",
            span_name = name,
            reason = self.reason,
            node_count = self.node_count,
        )
    }
}

/// Every node reached Stopped and the scheduler loop exited.
///
/// # Log Level
/// `info!` on a clean stop, `error!` when the engine carries an error
pub struct EngineStopped<'a> {
    pub error: Option<&'a dyn std::error::Error>,
}

impl Display for EngineStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.error {
            Some(error) => write!(f, "Dependency engine stopped with error: {}", error),
            None => write!(f, "Dependency engine stopped cleanly"),
        }
    }
}

impl StructuredLog for EngineStopped<'_> {
    fn log(&self) {
        match self.error {
            Some(error) => tracing::error!(error = %error, "{}", self),
            None => tracing::info!("{}", self),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("engine_stopped", span_name = name, failed = self.error.is_some())
    }
}

/// A worker reported an error that ends the engine.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use manifold_engine::observability::messages::engine::EngineFatal;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
/// let msg = EngineFatal {
///     name: "storage",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct EngineFatal<'a> {
    pub name: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for EngineFatal<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Fatal error from '{}', stopping engine: {}",
            self.name, self.error
        )
    }
}

impl StructuredLog for EngineFatal<'_> {
    fn log(&self) {
        tracing::error!(manifold = self.name, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "engine_fatal",
            span_name = name,
            manifold = self.name,
            error = %self.error,
        )
    }
}

/// Shutdown did not complete within the configured timeout.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ShutdownTimedOut<'a> {
    pub pending: &'a [String],
    pub timeout: Duration,
}

impl Display for ShutdownTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Shutdown exceeded {:?}; still waiting for: {}",
            self.timeout,
            self.pending.join(", ")
        )
    }
}

impl StructuredLog for ShutdownTimedOut<'_> {
    fn log(&self) {
        tracing::error!(
            pending = %self.pending.join(", "),
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("shutdown_timed_out", span_name = name)
    }
}

/// A manifold was added, replaced or removed.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use manifold_engine::observability::messages::engine::{ManifoldChange, ManifoldChanged};
///
/// let inputs = vec!["agent".to_string()];
/// let msg = ManifoldChanged {
///     name: "api-caller",
///     change: ManifoldChange::Installed,
///     inputs: &inputs,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ManifoldChanged<'a> {
    pub name: &'a str,
    pub change: ManifoldChange,
    pub inputs: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldChange {
    Installed,
    Replaced,
    Uninstalled,
}

impl Display for ManifoldChange {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let word = match self {
            ManifoldChange::Installed => "installed",
            ManifoldChange::Replaced => "replaced",
            ManifoldChange::Uninstalled => "uninstalled",
        };
        f.write_str(word)
    }
}

impl Display for ManifoldChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.inputs.is_empty() {
            write!(f, "Manifold '{}' {}", self.name, self.change)
        } else {
            write!(
                f,
                "Manifold '{}' {} (inputs: {})",
                self.name,
                self.change,
                self.inputs.join(", ")
            )
        }
    }
}

impl StructuredLog for ManifoldChanged<'_> {
    fn log(&self) {
        tracing::info!(
            manifold = self.name,
            change = %self.change,
            input_count = self.inputs.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "manifold_changed",
            span_name = name,
            manifold = self.name,
            change = %self.change,
        )
    }
}
