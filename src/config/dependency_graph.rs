// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Reverse index over manifold inputs: name -> names that list it as an input.
///
/// Manifolds declare what they consume, not who consumes them, so the engine
/// rebuilds this index whenever the set of manifolds changes. Names that are
/// referenced as inputs but not installed still get an entry, which lets a
/// late install find the dependents waiting on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph(pub HashMap<String, Vec<String>>);

impl DependencyGraph {
    /// Build the reverse index from `(name, inputs)` pairs.
    ///
    /// Dependents are kept sorted so that cascades visit them in a stable order.
    pub fn from_inputs<'a, I, D>(manifolds: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, D)>,
        D: IntoIterator<Item = &'a String>,
    {
        let mut graph: HashMap<String, Vec<String>> = HashMap::new();
        for (name, inputs) in manifolds {
            graph.entry(name.clone()).or_default();
            for input in inputs {
                let dependents = graph.entry(input.clone()).or_default();
                if !dependents.contains(name) {
                    dependents.push(name.clone());
                }
            }
        }
        for dependents in graph.values_mut() {
            dependents.sort();
        }
        Self(graph)
    }

    /// Names that directly depend on `name`.
    pub fn dependents(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every name that depends on `name`, directly or through other manifolds.
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut stack: Vec<&str> = vec![name];
        while let Some(current) = stack.pop() {
            for dependent in self.dependents(current) {
                if dependent != name && !seen.contains(dependent) {
                    seen.push(dependent.clone());
                    stack.push(dependent);
                }
            }
        }
        seen.sort();
        seen
    }
}
