// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The scheduler loop: the single owner of the engine graph.
//!
//! Every mutation of node state happens here, one event at a time. Callers
//! and supervisors only ever send [`Event`]s; nothing else holds a reference
//! to the graph, so no locks are needed.
//!
//! ## Node lifecycle
//!
//! ```text
//! Stopped -> Starting -> Started -> Stopping -> Stopped
//!               \______________________/
//!                 (abandoned start)
//! ```
//!
//! A node starts once every input is Started. When a node has to stop, it
//! and all of its transitive dependents are marked Stopping at once, but
//! `kill` is only sent to a worker after every one of its dependents has
//! reached Stopped. Teardown therefore always runs dependents first, for
//! engine shutdown and for a withdrawn input alike.
//!
//! ## Restarts
//!
//! * a failed start or a worker error waits for the node's backoff delay
//! * a worker that exits cleanly on its own waits for the base delay
//! * `Bounce` waits for the bounce delay and does not count as a failure
//! * resource errors from a start function wait for an input to restart
//!   instead of a timer

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::backoff::Backoff;
use crate::engine::context::Context;
use crate::engine::event::Event;
use crate::engine::graph::Graph;
use crate::engine::node::{Node, Phase};
use crate::engine::report::{EngineState, NodeState};
use crate::engine::supervisor::{spawn_start, spawn_wait};
use crate::engine::Manifold;
use crate::errors::{EngineError, ValidationError, WorkerError};
use crate::observability::messages::engine::{
    EngineFatal, EngineShutdownStarted, EngineStarted, EngineStopped, ManifoldChange,
    ManifoldChanged, ShutdownTimedOut,
};
use crate::observability::messages::node::{
    NodeStartFailed, NodeStarted, NodeStarting, NodeStopped, NodeStopping, RetryScheduled,
    StaleEventIgnored,
};
use crate::observability::messages::validation::{CycleRejected, ForwardReference};
use crate::observability::messages::StructuredLog;

/// What led to an error the scheduler has to classify.
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// The start function failed.
    Start,
    /// The start function failed after the engine had abandoned it.
    AbandonedStart,
    /// The worker stopped, on its own or on request.
    Exit,
}

pub(crate) struct Scheduler {
    config: EngineConfig,
    backoff: Backoff,
    graph: Graph,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    kill: CancellationToken,
    state: EngineState,
    fatal: Option<EngineError>,
    start_queue: VecDeque<String>,
    starting: usize,
    deadline: Option<Instant>,
    retry_epochs: u64,
}

impl Scheduler {
    pub fn new(
        config: EngineConfig,
        events_tx: UnboundedSender<Event>,
        events_rx: UnboundedReceiver<Event>,
        kill: CancellationToken,
    ) -> Self {
        Self {
            backoff: Backoff::from_config(&config),
            config,
            graph: Graph::default(),
            events_tx,
            events_rx,
            kill,
            state: EngineState::Running,
            fatal: None,
            start_queue: VecDeque::new(),
            starting: 0,
            deadline: None,
            retry_epochs: 0,
        }
    }

    /// Process events until the engine has been killed and every node has stopped.
    pub async fn run(mut self) -> Result<(), EngineError> {
        EngineStarted {
            error_delay: self.config.error_delay(),
            max_delay: self.config.max_delay(),
            max_concurrent_starts: self.config.max_concurrent_starts,
        }
        .log();

        let kill = self.kill.clone();
        loop {
            if self.state == EngineState::Stopping && self.graph.all_stopped() {
                break;
            }

            let deadline = self.deadline;
            tokio::select! {
                biased;

                _ = kill.cancelled(), if self.state == EngineState::Running => {
                    self.begin_shutdown("kill requested");
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.shutdown_timed_out();
                    break;
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }

        self.state = EngineState::Stopped;
        let result = match self.fatal.take() {
            Some(error) => Err(error),
            None => Ok(()),
        };
        EngineStopped {
            error: result
                .as_ref()
                .err()
                .map(|error| error as &dyn std::error::Error),
        }
        .log();
        result
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Install {
                name,
                manifold,
                reply,
            } => {
                let _ = reply.send(self.install(name, manifold));
            }
            Event::Uninstall { name, reply } => {
                let _ = reply.send(self.uninstall(&name));
            }
            Event::Report { reply } => {
                let _ = reply.send(self.graph.report(self.state));
            }
            Event::StartCompleted {
                name,
                generation,
                result,
            } => self.start_completed(name, generation, result),
            Event::StartPanicked {
                name,
                generation,
                message,
            } => self.start_panicked(name, generation, message),
            Event::WorkerStopped {
                name,
                generation,
                result,
            } => self.worker_stopped(name, generation, result),
            Event::WaitPanicked {
                name,
                generation,
                message,
            } => self.wait_panicked(name, generation, message),
            Event::RetryDue { name, epoch } => self.retry_due(name, epoch),
        }
    }

    // ---- requests ----

    fn install(&mut self, name: String, manifold: Manifold) -> Result<(), EngineError> {
        if name.is_empty() {
            return Err(EngineError::EmptyName);
        }
        if self.state != EngineState::Running {
            return Err(EngineError::Dying);
        }
        if let Err(reason) = self.graph.check_acyclic(&name, &manifold) {
            if let ValidationError::CyclicDependency { cycle } = &reason {
                CycleRejected {
                    name: &name,
                    cycle,
                }
                .log();
            }
            return Err(EngineError::InvalidManifold { name, reason });
        }
        for input in manifold.inputs() {
            if !self.graph.contains(input) {
                tracing::debug!(
                    "{}",
                    ForwardReference {
                        name: &name,
                        input,
                    }
                );
            }
        }

        let change = match self.graph.get_mut(&name) {
            None => {
                ManifoldChanged {
                    name: &name,
                    change: ManifoldChange::Installed,
                    inputs: manifold.inputs(),
                }
                .log();
                self.graph.insert(name.clone(), Node::new(manifold));
                ManifoldChange::Installed
            }
            Some(node) => {
                ManifoldChanged {
                    name: &name,
                    change: ManifoldChange::Replaced,
                    inputs: manifold.inputs(),
                }
                .log();
                if node.is_stopped() {
                    node.replace(manifold);
                } else {
                    node.uninstalling = false;
                    node.replacement = Some(manifold);
                }
                self.graph.rebuild_index();
                ManifoldChange::Replaced
            }
        };

        if change == ManifoldChange::Replaced {
            self.stop_node(&name, "manifold replaced");
        }
        self.request_start(&name);
        for dependent in self.graph.dependents(&name) {
            self.request_start(&dependent);
        }
        Ok(())
    }

    fn uninstall(&mut self, name: &str) -> Result<(), EngineError> {
        let Some(node) = self.graph.get_mut(name) else {
            return Err(EngineError::NotInstalled(name.to_string()));
        };
        node.uninstalling = true;
        node.replacement = None;
        node.cancel_retry();
        if node.is_stopped() {
            self.remove_node(name);
        } else {
            self.stop_node(name, "manifold uninstalled");
        }
        Ok(())
    }

    fn remove_node(&mut self, name: &str) {
        let Some(mut node) = self.graph.remove(name) else {
            return;
        };
        node.cancel_retry();
        if node.queued {
            self.start_queue.retain(|queued| queued != name);
        }
        ManifoldChanged {
            name,
            change: ManifoldChange::Uninstalled,
            inputs: node.manifold.inputs(),
        }
        .log();
    }

    // ---- starting ----

    /// Start `name` if it is stopped, has nothing pending and all inputs run.
    fn request_start(&mut self, name: &str) {
        if self.state != EngineState::Running {
            return;
        }
        let Some(node) = self.graph.get(name) else {
            return;
        };
        if !node.is_stopped()
            || node.retry_pending
            || node.queued
            || node.uninstalling
            || node.is_blocked()
        {
            return;
        }
        if !self.graph.inputs_started(name) {
            return;
        }

        if let Some(limit) = self.config.max_concurrent_starts {
            if self.starting >= limit {
                if let Some(node) = self.graph.get_mut(name) {
                    node.queued = true;
                }
                self.start_queue.push_back(name.to_string());
                return;
            }
        }
        self.launch(name);
    }

    fn launch(&mut self, name: &str) {
        let resources = self.graph.resources(name);
        let Some(node) = self.graph.get_mut(name) else {
            return;
        };

        node.generation += 1;
        node.start_count += 1;
        let abort = self.kill.child_token();
        node.phase = Phase::Starting {
            abort: abort.clone(),
        };

        NodeStarting {
            name,
            generation: node.generation,
            inputs: node.manifold.inputs(),
        }
        .log();

        self.starting += 1;
        spawn_start(
            name.to_string(),
            node.generation,
            node.manifold.start_fn(),
            Context::new(name.to_string(), resources, abort),
            self.events_tx.clone(),
        );
    }

    fn drain_start_queue(&mut self) {
        let limit = self.config.max_concurrent_starts.unwrap_or(usize::MAX);
        while self.starting < limit {
            let Some(name) = self.start_queue.pop_front() else {
                break;
            };
            if let Some(node) = self.graph.get_mut(&name) {
                node.queued = false;
            }
            self.request_start(&name);
        }
    }

    fn start_completed(
        &mut self,
        name: String,
        generation: u64,
        result: Result<std::sync::Arc<dyn crate::traits::Worker>, WorkerError>,
    ) {
        self.starting = self.starting.saturating_sub(1);

        let Some(node) = self.current(&name, generation, "start result") else {
            if let Ok(worker) = result {
                worker.kill();
            }
            self.drain_start_queue();
            return;
        };
        let result = result.map_err(|error| node.manifold.filter_error(error));

        match (std::mem::replace(&mut node.phase, Phase::Stopped), result) {
            (Phase::Starting { .. }, Ok(worker)) => {
                node.phase = Phase::Started {
                    worker: worker.clone(),
                };
                node.started_at = Some(Instant::now());
                NodeStarted {
                    name: &name,
                    generation,
                }
                .log();
                spawn_wait(name.clone(), generation, worker, self.events_tx.clone());
                for dependent in self.graph.dependents(&name) {
                    self.request_start(&dependent);
                }
            }
            (Phase::Starting { .. }, Err(error)) => {
                NodeStartFailed {
                    name: &name,
                    generation,
                    error: &error,
                }
                .log();
                self.handle_failure(&name, error, Origin::Start);
            }
            (Phase::Stopping { .. }, Ok(worker)) => {
                node.phase = Phase::Stopping {
                    worker: Some(worker.clone()),
                    killed: false,
                };
                node.started_at = Some(Instant::now());
                spawn_wait(name.clone(), generation, worker, self.events_tx.clone());
                self.try_kill(&name);
            }
            (Phase::Stopping { .. }, Err(error)) => {
                NodeStartFailed {
                    name: &name,
                    generation,
                    error: &error,
                }
                .log();
                self.after_requested_stop(&name, Err(error), Origin::AbandonedStart);
                self.kill_drained();
            }
            (phase, result) => {
                // only Starting and Stopping nodes have a start in flight
                node.phase = phase;
                if let Ok(worker) = result {
                    worker.kill();
                }
            }
        }
        self.drain_start_queue();
    }

    fn start_panicked(&mut self, name: String, generation: u64, message: String) {
        self.starting = self.starting.saturating_sub(1);
        if let Some(node) = self.current(&name, generation, "start panic") {
            node.phase = Phase::Stopped;
            node.last_error = Some(WorkerError::failed(format!("start panicked: {}", message)));
        }
        self.record_fatal(&name, EngineError::StartPanicked { name: name.clone(), message });
        self.begin_shutdown("start function panicked");
        self.kill_drained();
    }

    // ---- stopping ----

    /// Move `name` and, transitively, everything that depends on it to Stopping.
    fn stop_node(&mut self, name: &str, reason: &str) {
        let Some(node) = self.graph.get_mut(name) else {
            return;
        };
        match std::mem::replace(&mut node.phase, Phase::Stopped) {
            Phase::Starting { abort } => {
                abort.cancel();
                node.phase = Phase::Stopping {
                    worker: None,
                    killed: false,
                };
            }
            Phase::Started { worker } => {
                node.phase = Phase::Stopping {
                    worker: Some(worker),
                    killed: false,
                };
            }
            other => {
                node.phase = other;
                return;
            }
        }

        NodeStopping {
            name,
            reason,
            dependents: &self.graph.transitive_dependents(name),
        }
        .log();
        for dependent in self.graph.dependents(name) {
            self.stop_node(&dependent, "input stopping");
        }
        self.try_kill(name);
    }

    /// Send `kill` to a stopping worker once none of its dependents still run.
    fn try_kill(&mut self, name: &str) {
        let dependents = self.graph.dependents(name);
        if !dependents.iter().all(|dependent| self.graph.is_stopped(dependent)) {
            return;
        }
        let Some(node) = self.graph.get_mut(name) else {
            return;
        };
        if let Phase::Stopping {
            worker: Some(worker),
            killed,
        } = &mut node.phase
        {
            if !*killed {
                *killed = true;
                tracing::debug!(manifold = name, "Sending kill to '{}'", name);
                worker.kill();
            }
        }
    }

    /// Retry kills that were waiting on dependents.
    fn kill_drained(&mut self) {
        for name in self.graph.names_in(NodeState::Stopping) {
            self.try_kill(&name);
        }
    }

    fn worker_stopped(&mut self, name: String, generation: u64, result: Result<(), WorkerError>) {
        let Some(node) = self.current(&name, generation, "worker exit") else {
            return;
        };
        if node.worker().is_none() {
            StaleEventIgnored {
                name: &name,
                event: "worker exit",
                event_generation: generation,
                current_generation: Some(node.generation),
            }
            .log();
            return;
        }

        let result = result.map_err(|error| node.manifold.filter_error(error));
        let requested = matches!(node.phase, Phase::Stopping { .. });
        let ran_for = node
            .started_at
            .take()
            .map(|since| since.elapsed())
            .unwrap_or_default();
        node.phase = Phase::Stopped;
        if self.backoff.should_reset(ran_for) {
            if let Some(node) = self.graph.get_mut(&name) {
                node.failures = 0;
            }
        }

        NodeStopped {
            name: &name,
            generation,
            requested,
            error: result
                .as_ref()
                .err()
                .map(|error| error as &dyn std::error::Error),
        }
        .log();

        if requested {
            self.after_requested_stop(&name, result, Origin::Exit);
        } else {
            for dependent in self.graph.dependents(&name) {
                self.stop_node(&dependent, "input exited");
            }
            match result {
                Ok(()) => {
                    let delay = self.config.error_delay();
                    self.schedule_retry(&name, delay);
                }
                Err(error) => self.handle_failure(&name, error, Origin::Exit),
            }
        }
        self.kill_drained();
    }

    fn wait_panicked(&mut self, name: String, generation: u64, message: String) {
        if let Some(node) = self.current(&name, generation, "wait panic") {
            node.phase = Phase::Stopped;
            node.started_at = None;
            node.last_error = Some(WorkerError::failed(format!("worker panicked: {}", message)));
        }
        self.record_fatal(&name, EngineError::WaitPanicked { name: name.clone(), message });
        self.begin_shutdown("worker panicked");
        self.kill_drained();
    }

    /// Decide what a node does next after a stop the engine asked for.
    fn after_requested_stop(&mut self, name: &str, result: Result<(), WorkerError>, origin: Origin) {
        let Some(node) = self.graph.get_mut(name) else {
            return;
        };
        if node.uninstalling {
            if let Err(error) = &result {
                tracing::debug!(manifold = name, error = %error, "Error from uninstalled worker");
            }
            self.remove_node(name);
            return;
        }
        if let Some(manifold) = node.replacement.take() {
            node.replace(manifold);
            self.graph.rebuild_index();
            self.request_start(name);
            return;
        }
        match result {
            Ok(()) | Err(WorkerError::Bounce) => self.request_start(name),
            Err(error) => self.handle_failure(name, error, origin),
        }
    }

    // ---- failures and retries ----

    fn handle_failure(&mut self, name: &str, error: WorkerError, origin: Origin) {
        match error {
            WorkerError::Fatal(_) => {
                if let Some(node) = self.graph.get_mut(name) {
                    node.last_error = Some(error.clone());
                }
                self.record_fatal(
                    name,
                    EngineError::Fatal {
                        name: name.to_string(),
                        error,
                    },
                );
                self.begin_shutdown("fatal worker error");
            }
            WorkerError::Uninstall => {
                if let Some(node) = self.graph.get_mut(name) {
                    node.uninstalling = true;
                }
                self.remove_node(name);
            }
            WorkerError::Bounce => {
                let delay = self.config.bounce_delay();
                self.schedule_retry(name, delay);
            }
            error => {
                let Some(node) = self.graph.get_mut(name) else {
                    return;
                };
                match origin {
                    // wait for an input to come back instead of polling
                    Origin::Start if matches!(error, WorkerError::Resource(_)) => {
                        node.last_error = Some(error);
                    }
                    Origin::AbandonedStart => {
                        node.last_error = Some(error);
                        self.request_start(name);
                    }
                    _ => {
                        node.failures = node.failures.saturating_add(1);
                        node.last_error = Some(error);
                        let delay = self.backoff.delay(node.failures);
                        self.schedule_retry(name, delay);
                    }
                }
            }
        }
    }

    fn schedule_retry(&mut self, name: &str, delay: Duration) {
        if self.state != EngineState::Running {
            return;
        }
        self.retry_epochs += 1;
        let epoch = self.retry_epochs;
        let Some(node) = self.graph.get_mut(name) else {
            return;
        };
        node.cancel_retry();

        RetryScheduled {
            name,
            failures: node.failures,
            delay,
        }
        .log();

        let events = self.events_tx.clone();
        let due = name.to_string();
        let timer = tokio::spawn(async move {
            sleep(delay).await;
            let _ = events.send(Event::RetryDue { name: due, epoch });
        });
        node.retry_pending = true;
        node.retry_epoch = epoch;
        node.retry_timer = Some(timer.abort_handle());
    }

    fn retry_due(&mut self, name: String, epoch: u64) {
        let Some(node) = self.graph.get_mut(&name) else {
            return;
        };
        if !node.retry_pending || node.retry_epoch != epoch {
            return;
        }
        node.retry_pending = false;
        node.retry_timer = None;
        self.request_start(&name);
    }

    // ---- engine lifecycle ----

    fn begin_shutdown(&mut self, reason: &str) {
        if self.state != EngineState::Running {
            return;
        }
        self.state = EngineState::Stopping;
        self.kill.cancel();
        let timeout = self.config.shutdown_timeout();
        self.deadline = Some(Instant::now() + timeout);

        EngineShutdownStarted {
            reason,
            node_count: self.graph.len(),
            timeout,
        }
        .log();

        self.start_queue.clear();
        let names = self.graph.names();
        for name in &names {
            if let Some(node) = self.graph.get_mut(name) {
                node.queued = false;
                node.cancel_retry();
            }
        }
        for name in &names {
            self.stop_node(name, reason);
        }
    }

    fn shutdown_timed_out(&mut self) {
        let pending = self.graph.pending_names();
        ShutdownTimedOut {
            pending: &pending,
            timeout: self.config.shutdown_timeout(),
        }
        .log();
        if self.fatal.is_none() {
            self.fatal = Some(EngineError::ShutdownTimeout { pending });
        }
    }

    /// Keep the first fatal error; later ones are only logged.
    fn record_fatal(&mut self, name: &str, error: EngineError) {
        EngineFatal {
            name,
            error: &error,
        }
        .log();
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }

    /// The node for an event, or `None` (logged) if the event is stale.
    fn current(&mut self, name: &str, generation: u64, event: &'static str) -> Option<&mut Node> {
        let current_generation = self.graph.get(name).map(|node| node.generation);
        if current_generation != Some(generation) {
            StaleEventIgnored {
                name,
                event,
                event_generation: generation,
                current_generation,
            }
            .log();
            return None;
        }
        self.graph.get_mut(name)
    }
}
