// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `engine` - engine lifecycle and manifold installation
//! * `node` - node state machine transitions
//! * `validation` - graph validation failures

use tracing::Span;

pub mod engine;
pub mod node;
pub mod validation;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Open a span carrying the same fields as the message.
    fn span(&self, name: &str) -> Span;
}
