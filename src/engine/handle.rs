// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::event::Event;
use crate::engine::report::EngineReport;
use crate::engine::scheduler::Scheduler;
use crate::engine::Manifold;
use crate::errors::{EngineError, WorkerError};
use crate::traits::Worker;
use crate::utils::settled;

/// Handle to a running dependency engine.
///
/// The engine itself is a scheduler task spawned by [`Engine::new`]; this
/// handle only sends it requests. Handles are cheap to clone and every clone
/// talks to the same engine.
///
/// An engine runs until [`Engine::kill`] is called or a worker reports a
/// fatal error. It must be killed explicitly; dropping every handle does not
/// stop it.
///
/// # Example
/// ```
/// use manifold_engine::config::EngineConfig;
/// use manifold_engine::engine::{Engine, Manifold};
/// use manifold_engine::workers::ValueWorker;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::new(EngineConfig::default())?;
/// engine
///     .install("agent", Manifold::new(Vec::<String>::new(), |_ctx| async {
///         Ok(ValueWorker::new("agent-0"))
///     }))
///     .await?;
///
/// engine.kill();
/// engine.wait().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Engine {
    events: mpsc::UnboundedSender<Event>,
    kill: CancellationToken,
    done: watch::Receiver<Option<Result<(), EngineError>>>,
}

impl Engine {
    /// Validate `config` and start the scheduler loop on the current runtime.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let kill = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(None);

        let scheduler = Scheduler::new(config, events_tx.clone(), events_rx, kill.clone());
        tokio::spawn(async move {
            let result = scheduler.run().await;
            let _ = done_tx.send(Some(result));
        });

        Ok(Self {
            events: events_tx,
            kill,
            done: done_rx,
        })
    }

    /// Install `manifold` under `name`, replacing any manifold already there.
    ///
    /// A replaced worker is stopped, together with its dependents, before the
    /// new manifold's start function runs.
    ///
    /// # Errors
    /// * [`EngineError::EmptyName`] - `name` is empty
    /// * [`EngineError::InvalidManifold`] - the install would close a cycle
    /// * [`EngineError::Dying`] - the engine is shutting down
    /// * [`EngineError::Stopped`] - the engine has already stopped
    pub async fn install(
        &self,
        name: impl Into<String>,
        manifold: Manifold,
    ) -> Result<(), EngineError> {
        let name = name.into();
        self.request(|reply| Event::Install {
            name,
            manifold,
            reply,
        })
        .await?
    }

    /// Stop the named manifold's worker and its dependents, then forget it.
    pub async fn uninstall(&self, name: &str) -> Result<(), EngineError> {
        let name = name.to_string();
        self.request(|reply| Event::Uninstall { name, reply }).await?
    }

    pub async fn report(&self) -> Result<EngineReport, EngineError> {
        self.request(|reply| Event::Report { reply }).await
    }

    /// Begin shutdown. Returns immediately; use [`Engine::wait`] to block.
    pub fn kill(&self) {
        self.kill.cancel();
    }

    /// Wait for the engine to stop and return its final result.
    ///
    /// Any number of callers may wait; they all see the same result.
    pub async fn wait(&self) -> Result<(), EngineError> {
        settled(&self.done)
            .await
            .unwrap_or(Err(EngineError::Stopped))
    }

    async fn request<T>(
        &self,
        event: impl FnOnce(oneshot::Sender<T>) -> Event,
    ) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.events
            .send(event(reply))
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)
    }
}

/// Engines are workers too, so one engine can run inside another.
#[async_trait]
impl Worker for Engine {
    fn kill(&self) {
        Engine::kill(self);
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        Engine::wait(self).await.map_err(WorkerError::failed)
    }
}
