// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic the engine emits is a small message struct in
//! [`messages`] with a `Display` implementation, instead of an inline format
//! string. This keeps wording in one place and lets each message decide
//! which structured fields accompany it.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - engine lifecycle and install/uninstall requests
//! * `messages::node` - per-node state transitions, retries and stale events
//! * `messages::validation` - rejected manifold graphs
//!
//! # Usage
//!
//! ```rust
//! use manifold_engine::observability::messages::node::NodeStarted;
//! use manifold_engine::observability::messages::StructuredLog;
//!
//! let msg = NodeStarted {
//!     name: "api-caller",
//!     generation: 3,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
