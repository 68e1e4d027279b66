// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ready-made workers.
//!
//! * [`TaskWorker`] - runs a future until it finishes or is killed
//! * [`ValueWorker`] - exposes a fixed value to dependents
//! * [`FlagWorker`] - exposes a boolean that gates other manifolds
//! * [`StubWorker`] - records its lifecycle in an [`EventLog`], for tests and demos

mod flag;
mod stub;
mod task;
mod value;

pub use flag::{flag_output, Flag, FlagWorker};
pub use stub::{stub_manifold, EventLog, StubBehavior, StubWorker};
pub use task::TaskWorker;
pub use value::{value_output, ValueWorker};
