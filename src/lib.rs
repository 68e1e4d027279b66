// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // engine settings + topology files
pub mod engine;        // scheduler, graph, supervisor
pub mod errors;        // error handling
pub mod observability; // structured log messages
pub mod traits;        // the Worker abstraction
pub mod workers;       // stock workers

mod utils;

pub use engine::{Context, Engine, EngineReport, Manifold};
pub use errors::{EngineError, ResourceError, WorkerError};
pub use traits::Worker;
