// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Diagnostic snapshots of the engine, for operators and tests.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::errors::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Stopped,
    Starting,
    Started,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Running,
    Stopping,
    Stopped,
}

/// One node's entry in an [`EngineReport`].
///
/// # Fields
/// * `state` - Current lifecycle state
/// * `inputs` - Declared input names of the installed manifold
/// * `generation` - Number of the most recent start attempt
/// * `start_count` - Start attempts since install (survives replacement)
/// * `failures` - Consecutive failures feeding the backoff delay
/// * `last_error` - Most recent error from the start function or worker
/// * `retry_pending` - A delayed restart is scheduled
/// * `report` - The running worker's own diagnostic output, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStatus {
    pub state: NodeState,
    pub inputs: Vec<String>,
    pub generation: u64,
    pub start_count: u64,
    pub failures: u32,
    #[serde(
        serialize_with = "serialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_error: Option<WorkerError>,
    pub retry_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineReport {
    pub state: EngineState,
    pub nodes: BTreeMap<String, NodeStatus>,
}

impl EngineReport {
    pub fn node(&self, name: &str) -> Option<&NodeStatus> {
        self.nodes.get(name)
    }

    pub fn state_of(&self, name: &str) -> Option<NodeState> {
        self.node(name).map(|status| status.state)
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<WorkerError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_str(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_serializes_for_operators() {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "api-caller".to_string(),
            NodeStatus {
                state: NodeState::Stopped,
                inputs: vec!["agent".to_string()],
                generation: 4,
                start_count: 4,
                failures: 2,
                last_error: Some(WorkerError::failed("connection refused")),
                retry_pending: true,
                report: None,
            },
        );
        let report = EngineReport {
            state: EngineState::Running,
            nodes,
        };

        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value,
            json!({
                "state": "running",
                "nodes": {
                    "api-caller": {
                        "state": "stopped",
                        "inputs": ["agent"],
                        "generation": 4,
                        "start_count": 4,
                        "failures": 2,
                        "last_error": "connection refused",
                        "retry_pending": true
                    }
                }
            })
        );
        assert_eq!(report.state_of("api-caller"), Some(NodeState::Stopped));
        assert_eq!(report.state_of("machiner"), None);
    }
}
