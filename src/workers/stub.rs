// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stand-in workers that write their lifecycle into a shared log.
//!
//! Entries look like `start:<name>`, `fail:<name>`, `kill:<name>`,
//! `crash:<name>` and `stop:<name>`, in the order they happened.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::engine::{Context, Manifold};
use crate::errors::WorkerError;
use crate::traits::Worker;
use crate::workers::TaskWorker;

/// Shared, ordered record of lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Index of the first occurrence of `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.lock().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.lock().iter().filter(|e| *e == entry).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // a panicking test thread must not hide the log from the others
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How a stub manifold misbehaves.
///
/// # Fields
/// * `fail_start` - Number of start attempts that fail before one succeeds
/// * `crash_after_ms` - If set, each worker fails on its own after this long
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StubBehavior {
    pub fail_start: u32,
    pub crash_after_ms: Option<u64>,
}

/// A worker that runs until killed, or until its crash timer fires.
pub struct StubWorker {
    name: String,
    log: EventLog,
    task: TaskWorker,
}

impl StubWorker {
    pub fn start(name: impl Into<String>, log: EventLog, crash_after: Option<Duration>) -> Self {
        let name = name.into();
        log.record(format!("start:{}", name));

        let task = TaskWorker::spawn({
            let name = name.clone();
            let log = log.clone();
            move |token| async move {
                let result = match crash_after {
                    Some(after) => tokio::select! {
                        _ = token.cancelled() => Ok(()),
                        _ = tokio::time::sleep(after) => {
                            log.record(format!("crash:{}", name));
                            Err(WorkerError::failed(format!("{} crashed", name)))
                        }
                    },
                    None => {
                        token.cancelled().await;
                        Ok(())
                    }
                };
                log.record(format!("stop:{}", name));
                result
            }
        });

        Self { name, log, task }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Worker for StubWorker {
    fn kill(&self) {
        if !self.task.token().is_cancelled() && !self.task.is_finished() {
            self.log.record(format!("kill:{}", self.name));
        }
        self.task.kill();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.task.wait().await
    }

    fn report(&self) -> Option<serde_json::Value> {
        Some(json!({ "stub": self.name }))
    }
}

/// Build a manifold whose workers are [`StubWorker`]s.
///
/// Every declared input must be running when the start function is called;
/// the first `behavior.fail_start` attempts fail on purpose.
pub fn stub_manifold<I, S>(inputs: I, behavior: StubBehavior, log: EventLog) -> Manifold
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let attempts = Arc::new(AtomicU32::new(0));
    Manifold::new(inputs, move |ctx: Context| {
        let log = log.clone();
        let behavior = behavior.clone();
        let attempts = attempts.clone();
        async move {
            for input in ctx.inputs() {
                ctx.require(input)?;
            }
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= behavior.fail_start {
                log.record(format!("fail:{}", ctx.name()));
                return Err(WorkerError::failed(format!(
                    "{} refused to start (attempt {} of {})",
                    ctx.name(),
                    attempt,
                    behavior.fail_start
                )));
            }
            Ok(StubWorker::start(
                ctx.name(),
                log,
                behavior.crash_after_ms.map(Duration::from_millis),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_positions_and_counts() {
        let log = EventLog::new();
        log.record("start:a");
        log.record("start:b");
        log.record("start:a");

        assert_eq!(log.position("start:b"), Some(1));
        assert_eq!(log.count("start:a"), 2);
        assert_eq!(log.position("kill:a"), None);
        assert_eq!(log.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_stub_records_kill_once_and_stop() {
        let log = EventLog::new();
        let worker = StubWorker::start("agent", log.clone(), None);

        worker.kill();
        worker.kill();
        worker.wait().await.unwrap();

        assert_eq!(log.entries(), vec!["start:agent", "kill:agent", "stop:agent"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stub_crashes_after_delay() {
        let log = EventLog::new();
        let worker = StubWorker::start("machiner", log.clone(), Some(Duration::from_millis(100)));

        let result = worker.wait().await;

        assert_eq!(result, Err(WorkerError::failed("machiner crashed")));
        assert_eq!(
            log.entries(),
            vec!["start:machiner", "crash:machiner", "stop:machiner"]
        );
    }
}
