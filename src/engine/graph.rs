// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The scheduler's private bookkeeping: nodes by name plus the reverse
//! dependency index.
//!
//! Nothing outside the scheduler loop touches a `Graph`, so it needs no
//! locking. The index is rebuilt whenever a manifold is added, removed or
//! replaced; installs are rare compared to state transitions, and a rebuild
//! keeps forward references trivially correct.

use std::collections::{BTreeMap, HashMap};

use crate::config::{find_cycle, DependencyGraph};
use crate::engine::context::Resource;
use crate::engine::node::{Node, Phase};
use crate::engine::report::{EngineReport, EngineState, NodeState, NodeStatus};
use crate::engine::Manifold;
use crate::errors::ValidationError;

#[derive(Default)]
pub(crate) struct Graph {
    nodes: HashMap<String, Node>,
    index: DependencyGraph,
}

impl Graph {
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn insert(&mut self, name: String, node: Node) {
        self.nodes.insert(name, node);
        self.rebuild_index();
    }

    pub fn remove(&mut self, name: &str) -> Option<Node> {
        let node = self.nodes.remove(name);
        self.rebuild_index();
        node
    }

    pub fn rebuild_index(&mut self) {
        self.index = DependencyGraph::from_inputs(
            self.nodes
                .iter()
                .map(|(name, node)| (name, node.all_inputs())),
        );
    }

    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.index.dependents(name).to_vec()
    }

    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        self.index.transitive_dependents(name)
    }

    /// True if every input of the node's current manifold is installed and Started.
    pub fn inputs_started(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|node| {
            node.manifold.inputs().iter().all(|input| {
                self.nodes
                    .get(input)
                    .is_some_and(|input| input.is_started())
            })
        })
    }

    /// Absent nodes count as stopped.
    pub fn is_stopped(&self, name: &str) -> bool {
        self.nodes.get(name).map_or(true, Node::is_stopped)
    }

    pub fn all_stopped(&self) -> bool {
        self.nodes.values().all(Node::is_stopped)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn names_in(&self, state: NodeState) -> Vec<String> {
        let mut names: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.state() == state)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn pending_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| !node.is_stopped())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Snapshot of a node's inputs for its start function.
    pub fn resources(&self, name: &str) -> BTreeMap<String, Option<Resource>> {
        let Some(node) = self.nodes.get(name) else {
            return BTreeMap::new();
        };
        node.manifold
            .inputs()
            .iter()
            .map(|input| {
                let resource = self.nodes.get(input).and_then(|input| match &input.phase {
                    Phase::Started { worker } => Some(Resource {
                        worker: worker.clone(),
                        output: input.manifold.output_fn(),
                    }),
                    _ => None,
                });
                (input.clone(), resource)
            })
            .collect()
    }

    /// Reject `manifold` under `name` if it would close a dependency cycle.
    ///
    /// The installed graph is acyclic, so any cycle found passes through `name`.
    pub fn check_acyclic(&self, name: &str, manifold: &Manifold) -> Result<(), ValidationError> {
        let mut inputs: BTreeMap<&str, &[String]> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node.latest_inputs()))
            .collect();
        inputs.insert(name, manifold.inputs());

        match find_cycle(&inputs) {
            Some(cycle) => Err(ValidationError::CyclicDependency { cycle }),
            None => Ok(()),
        }
    }

    pub fn report(&self, state: EngineState) -> EngineReport {
        let nodes = self
            .nodes
            .iter()
            .map(|(name, node)| {
                let status = NodeStatus {
                    state: node.state(),
                    inputs: node.manifold.inputs().to_vec(),
                    generation: node.generation,
                    start_count: node.start_count,
                    failures: node.failures,
                    last_error: node.last_error.clone(),
                    retry_pending: node.retry_pending,
                    report: node.worker().and_then(|worker| worker.report()),
                };
                (name.clone(), status)
            })
            .collect();
        EngineReport { state, nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::ValueWorker;
    use std::sync::Arc;

    fn manifold(inputs: &[&str]) -> Manifold {
        Manifold::new(inputs.to_vec(), |_ctx| async { Ok(ValueWorker::new(())) })
    }

    fn graph(pairs: &[(&str, &[&str])]) -> Graph {
        let mut graph = Graph::default();
        for (name, inputs) in pairs {
            graph.insert(name.to_string(), Node::new(manifold(inputs)));
        }
        graph
    }

    fn start(graph: &mut Graph, name: &str) {
        if let Some(node) = graph.get_mut(name) {
            node.phase = Phase::Started {
                worker: Arc::new(ValueWorker::new(name.to_string())),
            };
        }
    }

    #[test]
    fn test_inputs_started_requires_every_input() {
        let mut graph = graph(&[("agent", &[]), ("clock", &[]), ("machiner", &["agent", "clock"])]);
        assert!(graph.inputs_started("agent"));
        assert!(!graph.inputs_started("machiner"));

        start(&mut graph, "agent");
        assert!(!graph.inputs_started("machiner"));

        start(&mut graph, "clock");
        assert!(graph.inputs_started("machiner"));
    }

    #[test]
    fn test_forward_reference_is_never_started() {
        let graph = graph(&[("machiner", &["api-caller"])]);
        assert!(!graph.inputs_started("machiner"));
        assert_eq!(graph.dependents("api-caller"), vec!["machiner"]);
    }

    #[test]
    fn test_index_follows_removal() {
        let mut graph = graph(&[("agent", &[]), ("machiner", &["agent"])]);
        assert_eq!(graph.dependents("agent"), vec!["machiner"]);

        graph.remove("machiner");
        assert!(graph.dependents("agent").is_empty());
        assert!(graph.is_stopped("machiner"));
    }

    #[test]
    fn test_check_acyclic_rejects_closing_edge() {
        let graph = graph(&[("a", &["c"]), ("b", &["a"])]);

        let error = graph.check_acyclic("c", &manifold(&["b"])).unwrap_err();

        assert_eq!(
            error,
            ValidationError::CyclicDependency {
                cycle: vec![
                    "a".to_string(),
                    "c".to_string(),
                    "b".to_string(),
                    "a".to_string()
                ],
            }
        );
        assert!(graph.check_acyclic("c", &manifold(&[])).is_ok());
    }

    #[test]
    fn test_check_acyclic_rejects_self_dependency() {
        let graph = Graph::default();
        assert!(graph.check_acyclic("a", &manifold(&["a"])).is_err());
    }

    #[test]
    fn test_resources_snapshot() {
        let mut graph = graph(&[("agent", &[]), ("clock", &[]), ("machiner", &["agent", "clock"])]);
        start(&mut graph, "agent");

        let resources = graph.resources("machiner");

        assert_eq!(resources.len(), 2);
        assert!(resources["agent"].is_some());
        assert!(resources["clock"].is_none());
    }

    #[test]
    fn test_report_lists_every_node() {
        let mut graph = graph(&[("agent", &[]), ("machiner", &["agent"])]);
        start(&mut graph, "agent");

        let report = graph.report(EngineState::Running);

        assert_eq!(report.state_of("agent"), Some(NodeState::Started));
        assert_eq!(report.state_of("machiner"), Some(NodeState::Stopped));
        assert_eq!(report.node("machiner").unwrap().inputs, vec!["agent"]);
        assert_eq!(graph.names_in(NodeState::Started), vec!["agent"]);
        assert_eq!(graph.pending_names(), vec!["agent"]);
    }
}
