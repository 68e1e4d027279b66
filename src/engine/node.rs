// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::engine::report::NodeState;
use crate::engine::Manifold;
use crate::errors::{ResourceError, WorkerError};
use crate::traits::Worker;

/// Where a node is in its lifecycle, with the data that phase owns.
pub(crate) enum Phase {
    Stopped,
    /// A start function is running; cancelling `abort` asks it to give up.
    Starting { abort: CancellationToken },
    Started { worker: Arc<dyn Worker> },
    /// `worker` is `None` while an abandoned start function is still running.
    /// `killed` records that `kill` has been sent.
    Stopping {
        worker: Option<Arc<dyn Worker>>,
        killed: bool,
    },
}

impl Phase {
    pub fn state(&self) -> NodeState {
        match self {
            Phase::Stopped => NodeState::Stopped,
            Phase::Starting { .. } => NodeState::Starting,
            Phase::Started { .. } => NodeState::Started,
            Phase::Stopping { .. } => NodeState::Stopping,
        }
    }
}

/// Engine-side record for one installed manifold.
pub(crate) struct Node {
    pub manifold: Manifold,
    /// Manifold waiting for the current worker to stop before taking over.
    pub replacement: Option<Manifold>,
    pub uninstalling: bool,
    pub phase: Phase,
    pub generation: u64,
    pub start_count: u64,
    pub started_at: Option<Instant>,
    pub failures: u32,
    pub last_error: Option<WorkerError>,
    pub retry_pending: bool,
    /// Engine-wide unique id of the last scheduled retry.
    pub retry_epoch: u64,
    /// Timer task of the pending retry.
    pub retry_timer: Option<AbortHandle>,
    pub queued: bool,
}

impl Node {
    pub fn new(manifold: Manifold) -> Self {
        Self {
            manifold,
            replacement: None,
            uninstalling: false,
            phase: Phase::Stopped,
            generation: 0,
            start_count: 0,
            started_at: None,
            failures: 0,
            last_error: None,
            retry_pending: false,
            retry_epoch: 0,
            retry_timer: None,
            queued: false,
        }
    }

    pub fn state(&self) -> NodeState {
        self.phase.state()
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.phase, Phase::Stopped)
    }

    pub fn is_started(&self) -> bool {
        matches!(self.phase, Phase::Started { .. })
    }

    /// Inputs of the manifold that will run next.
    pub fn latest_inputs(&self) -> &[String] {
        self.replacement
            .as_ref()
            .unwrap_or(&self.manifold)
            .inputs()
    }

    /// Inputs of both the running and the pending manifold.
    pub fn all_inputs(&self) -> Vec<&String> {
        let mut inputs: Vec<&String> = self.manifold.inputs().iter().collect();
        if let Some(replacement) = &self.replacement {
            for input in replacement.inputs() {
                if !inputs.contains(&input) {
                    inputs.push(input);
                }
            }
        }
        inputs
    }

    /// Swap in a new manifold on a stopped node and forget the old one's history.
    pub fn replace(&mut self, manifold: Manifold) {
        self.manifold = manifold;
        self.replacement = None;
        self.uninstalling = false;
        self.failures = 0;
        self.last_error = None;
        self.cancel_retry();
    }

    pub fn cancel_retry(&mut self) {
        self.retry_pending = false;
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
    }

    /// A start that failed with `Missing` is a bug in the manifold; it stays
    /// down until the manifold is replaced.
    pub fn is_blocked(&self) -> bool {
        matches!(
            self.last_error,
            Some(WorkerError::Resource(ResourceError::Missing { .. }))
        )
    }

    pub fn worker(&self) -> Option<&Arc<dyn Worker>> {
        match &self.phase {
            Phase::Started { worker } => Some(worker),
            Phase::Stopping {
                worker: Some(worker),
                ..
            } => Some(worker),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::ValueWorker;

    fn manifold(inputs: &[&str]) -> Manifold {
        Manifold::new(inputs.to_vec(), |_ctx| async { Ok(ValueWorker::new(())) })
    }

    #[test]
    fn test_all_inputs_merges_replacement() {
        let mut node = Node::new(manifold(&["agent", "clock"]));
        node.replacement = Some(manifold(&["clock", "api-caller"]));

        let inputs: Vec<&str> = node.all_inputs().into_iter().map(String::as_str).collect();

        assert_eq!(inputs, vec!["agent", "clock", "api-caller"]);
        assert_eq!(node.latest_inputs(), ["clock", "api-caller"]);
    }

    #[test]
    fn test_replace_clears_history() {
        let mut node = Node::new(manifold(&[]));
        node.failures = 3;
        node.last_error = Some(ResourceError::missing("agent").into());
        node.retry_pending = true;
        assert!(node.is_blocked());

        node.replace(manifold(&["agent"]));

        assert_eq!(node.failures, 0);
        assert!(node.last_error.is_none());
        assert!(!node.retry_pending);
        assert!(!node.is_blocked());
        assert!(node.retry_timer.is_none());
        assert_eq!(node.manifold.inputs(), ["agent"]);
    }

    #[test]
    fn test_worker_visible_while_started_or_stopping() {
        let mut node = Node::new(manifold(&[]));
        assert!(node.worker().is_none());

        let worker: Arc<dyn Worker> = Arc::new(ValueWorker::new(1u8));
        node.phase = Phase::Started {
            worker: worker.clone(),
        };
        assert!(node.worker().is_some());
        assert_eq!(node.state(), NodeState::Started);

        node.phase = Phase::Stopping {
            worker: None,
            killed: false,
        };
        assert!(node.worker().is_none());
        assert_eq!(node.state(), NodeState::Stopping);
    }

    #[tokio::test]
    async fn test_cancel_retry_aborts_timer() {
        let mut node = Node::new(manifold(&[]));
        let timer = tokio::spawn(std::future::pending::<()>());
        node.retry_timer = Some(timer.abort_handle());
        node.retry_pending = true;

        node.cancel_retry();

        assert!(!node.retry_pending);
        assert!(node.retry_timer.is_none());
        assert!(timer.await.unwrap_err().is_cancelled());
    }
}
