// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for manifold graph validation failures.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An install was refused because it would close a dependency cycle.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use manifold_engine::observability::messages::validation::CycleRejected;
///
/// let cycle = vec!["a".to_string(), "b".to_string(), "a".to_string()];
/// let msg = CycleRejected {
///     name: "b",
///     cycle: &cycle,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct CycleRejected<'a> {
    pub name: &'a str,
    pub cycle: &'a [String],
}

impl Display for CycleRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Refusing to install '{}': cyclic dependency {}",
            self.name,
            self.cycle.join(" -> ")
        )
    }
}

impl StructuredLog for CycleRejected<'_> {
    fn log(&self) {
        tracing::error!(
            manifold = self.name,
            cycle = %self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "cycle_rejected",
            span_name = name,
            manifold = self.name,
            cycle = %self.cycle.join(" -> "),
        )
    }
}

/// A manifold referenced an input that is not installed yet.
///
/// Not an error: forward references resolve once the input is installed.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ForwardReference<'a> {
    pub name: &'a str,
    pub input: &'a str,
}

impl Display for ForwardReference<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Manifold '{}' waits on '{}', which is not installed yet",
            self.name, self.input
        )
    }
}
