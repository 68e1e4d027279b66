// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod dependency_graph;
mod engine_config;
mod loader;
mod validation;

pub mod consts;

pub use dependency_graph::DependencyGraph;
pub use engine_config::EngineConfig;
pub use loader::{load_engine_config, load_topology, ManifoldConfig, Topology};
pub use validation::{find_cycle, validate_topology};
