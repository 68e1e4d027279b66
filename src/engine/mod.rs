// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The dependency engine.
//!
//! Callers install [`Manifold`]s by name. The engine starts each manifold's
//! worker once every input it names is running, stops workers whose inputs
//! go away, and restarts failed workers with backoff. All of this runs on a
//! single scheduler task; the [`Engine`] handle only sends it requests.

mod backoff;
mod context;
mod event;
mod graph;
mod handle;
mod manifold;
mod node;
mod report;
mod scheduler;
mod supervisor;


pub use backoff::Backoff;
pub use context::Context;
pub use handle::Engine;
pub use manifold::{BoxFuture, FilterFn, Manifold, OutputFn, OutputSlot, StartFn, StartResult};
pub use report::{EngineReport, EngineState, NodeState, NodeStatus};
