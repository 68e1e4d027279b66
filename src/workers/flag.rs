// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::engine::OutputSlot;
use crate::errors::{ResourceError, WorkerError};
use crate::traits::{downcast_worker, Worker};

/// A worker whose only output is a yes/no answer.
pub trait Flag {
    fn check(&self) -> bool;
}

/// A fixed flag. To change the answer, replace the manifold or bounce the
/// worker; everything gated on it restarts with the new value.
pub struct FlagWorker {
    value: bool,
    done: CancellationToken,
}

impl FlagWorker {
    pub fn new(value: bool) -> Self {
        Self {
            value,
            done: CancellationToken::new(),
        }
    }
}

impl Flag for FlagWorker {
    fn check(&self) -> bool {
        self.value
    }
}

#[async_trait]
impl Worker for FlagWorker {
    fn kill(&self) {
        self.done.cancel();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.done.cancelled().await;
        Ok(())
    }

    fn report(&self) -> Option<serde_json::Value> {
        Some(json!({ "flag": self.value }))
    }
}

/// Output function exposing any [`Flag`] worker as a `bool`.
pub fn flag_output<W: Flag + Worker>(
) -> impl Fn(&(dyn Worker + 'static), &mut OutputSlot<'_>) -> Result<(), ResourceError> + Send + Sync + 'static
{
    |worker: &(dyn Worker + 'static), slot: &mut OutputSlot<'_>| match downcast_worker::<W>(worker) {
        Some(flag) if slot.wants::<bool>() => slot.fill(flag.check()),
        _ => Err(ResourceError::UnsupportedOutput {
            requested: slot.requested(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_output_fills_bool() {
        let output = flag_output::<FlagWorker>();

        let mut value: Option<bool> = None;
        output(&FlagWorker::new(true), &mut OutputSlot::new(&mut value)).unwrap();
        assert_eq!(value, Some(true));

        let mut value: Option<bool> = None;
        output(&FlagWorker::new(false), &mut OutputSlot::new(&mut value)).unwrap();
        assert_eq!(value, Some(false));
    }

    #[test]
    fn test_flag_output_only_provides_bool() {
        let output = flag_output::<FlagWorker>();
        let mut value: Option<String> = None;
        assert!(output(&FlagWorker::new(true), &mut OutputSlot::new(&mut value)).is_err());
    }

    #[test]
    fn test_flag_report() {
        assert_eq!(FlagWorker::new(true).report(), Some(json!({ "flag": true })));
    }
}
