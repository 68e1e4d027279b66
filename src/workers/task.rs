// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::errors::WorkerError;
use crate::traits::Worker;
use crate::utils::{panic_message, settled};

/// A worker backed by a spawned future.
///
/// The future receives a cancellation token and should return soon after it
/// fires. Its result is kept, so `wait` can be called any number of times.
/// A panic inside the future is reported as [`WorkerError::Fatal`].
///
/// # Example
/// ```
/// use manifold_engine::traits::Worker;
/// use manifold_engine::workers::TaskWorker;
///
/// # #[tokio::main]
/// # async fn main() {
/// let worker = TaskWorker::spawn(|token| async move {
///     token.cancelled().await;
///     Ok(())
/// });
///
/// worker.kill();
/// assert!(worker.wait().await.is_ok());
/// # }
/// ```
pub struct TaskWorker {
    token: CancellationToken,
    result: watch::Receiver<Option<Result<(), WorkerError>>>,
}

impl TaskWorker {
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(None);

        let handle = tokio::spawn(task(token.clone()));
        tokio::spawn(async move {
            let result = match handle.await {
                Ok(result) => result,
                Err(error) if error.is_panic() => Err(WorkerError::fatal(format!(
                    "task panicked: {}",
                    panic_message(error)
                ))),
                Err(error) => Err(WorkerError::failed(panic_message(error))),
            };
            let _ = tx.send(Some(result));
        });

        Self { token, result: rx }
    }

    /// The token handed to the task; cancelling it is the same as `kill`.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.result.borrow().is_some()
    }
}

#[async_trait]
impl Worker for TaskWorker {
    fn kill(&self) {
        self.token.cancel();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        settled(&self.result)
            .await
            .unwrap_or_else(|| Err(WorkerError::failed("task result was lost")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_kill_cancels_task() {
        let worker = TaskWorker::spawn(|token| async move {
            token.cancelled().await;
            Ok(())
        });
        assert!(!worker.is_finished());

        worker.kill();
        worker.kill();

        assert_eq!(worker.wait().await, Ok(()));
        assert!(worker.is_finished());
    }

    #[tokio::test]
    async fn test_wait_replays_error() {
        let worker = TaskWorker::spawn(|_token| async { Err(WorkerError::failed("lost connection")) });

        let first = worker.wait().await;
        let second = worker.wait().await;

        assert_eq!(first, Err(WorkerError::failed("lost connection")));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_panic_is_fatal() {
        let worker = TaskWorker::spawn(|_token| async {
            if true {
                panic!("invariant broken");
            }
            Ok(())
        });

        assert_eq!(
            worker.wait().await,
            Err(WorkerError::fatal("task panicked: invariant broken"))
        );
    }
}
