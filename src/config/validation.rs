// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation for manifold graphs.
//!
//! Two callers rely on this module:
//!
//! * the engine, which calls [`find_cycle`] on every install so that a cycle is
//!   rejected up front instead of leaving its members starved forever
//! * the topology loader, which runs the full [`validate_topology`] pipeline
//!
//! # Validation Pipeline
//!
//! 1. **Name Validation**: names are non-empty and unique
//! 2. **Reference Validation**: every input names a manifold in the topology
//! 3. **Cycle Detection**: DFS with a recursion stack, reporting the cycle path
//! 4. **Engine Settings**: the embedded engine config passes its own checks
//!
//! Cycle detection runs last because it assumes a structurally valid graph.
//!
//! Inputs that name manifolds which do not exist are not edges for cycle
//! detection. The engine allows such forward references, and a cycle can
//! only close once every member is installed.

use std::collections::{BTreeMap, HashSet};

use crate::config::Topology;
use crate::errors::ValidationError;

/// Validates a topology file's manifolds and engine settings.
///
/// # Returns
///
/// * `Ok(())` - Topology is valid and ready to install
/// * `Err(Vec<ValidationError>)` - Every problem found, in pipeline order
pub fn validate_topology(topology: &Topology) -> Result<(), Vec<ValidationError>> {
    validate_names(topology)?;
    validate_input_references(topology)?;

    let inputs: BTreeMap<&str, &[String]> = topology
        .manifolds
        .iter()
        .map(|m| (m.name.as_str(), m.inputs.as_slice()))
        .collect();
    if let Some(cycle) = find_cycle(&inputs) {
        return Err(vec![ValidationError::CyclicDependency { cycle }]);
    }

    topology.engine.validate()
}

fn validate_names(topology: &Topology) -> Result<(), Vec<ValidationError>> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for manifold in &topology.manifolds {
        if manifold.name.is_empty() {
            errors.push(ValidationError::EmptyManifoldName);
        } else if !seen.insert(manifold.name.as_str()) {
            errors.push(ValidationError::DuplicateManifold {
                name: manifold.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_input_references(topology: &Topology) -> Result<(), Vec<ValidationError>> {
    let names: HashSet<&str> = topology.manifolds.iter().map(|m| m.name.as_str()).collect();
    let mut errors = Vec::new();

    for manifold in &topology.manifolds {
        for input in &manifold.inputs {
            if !names.contains(input.as_str()) {
                errors.push(ValidationError::UnresolvedInput {
                    manifold: manifold.name.clone(),
                    input: input.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Finds a dependency cycle among the given `name -> inputs` map.
///
/// Nodes are visited in name order so the reported path is deterministic.
/// The path starts and ends with the same name, e.g. `[a, b, a]` for
/// "a needs b, b needs a". A self-dependency is reported as `[a, a]`.
pub fn find_cycle(inputs: &BTreeMap<&str, &[String]>) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for name in inputs.keys() {
        if !visited.contains(*name) {
            if let Some(cycle) =
                dfs_cycle_detection(*name, inputs, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }
    }
    None
}

/// Depth-first search following `name -> input` edges.
///
/// `visited` holds fully explored names, `rec_stack` the names on the current
/// path. Reaching a name that is still on the path closes a cycle; the cycle
/// is the path segment from that name onwards plus the name again.
fn dfs_cycle_detection<'a>(
    node: &'a str,
    inputs: &BTreeMap<&'a str, &'a [String]>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = inputs.get(node) {
        for neighbor in neighbors.iter() {
            let Some((&neighbor, _)) = inputs.get_key_value(neighbor.as_str()) else {
                // forward reference to something not installed
                continue;
            };
            if rec_stack.contains(neighbor) {
                let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, inputs, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}
