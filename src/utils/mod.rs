// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Small helpers shared by the engine and the stock workers.

use std::any::Any;

use tokio::sync::watch;
use tokio::task::JoinError;

/// Wait until a write-once watch slot holds a value and return a copy of it.
///
/// Every caller sees the same value, no matter how many times it asks.
/// Returns `None` only if the sender was dropped without ever publishing.
pub(crate) async fn settled<T: Clone>(receiver: &watch::Receiver<Option<T>>) -> Option<T> {
    let mut receiver = receiver.clone();
    loop {
        let current = receiver.borrow_and_update().clone();
        if current.is_some() {
            return current;
        }
        if receiver.changed().await.is_err() {
            return receiver.borrow().clone();
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return "task was cancelled".to_string();
    }
    payload_message(error.into_panic())
}

fn payload_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settled_returns_published_value_to_every_caller() {
        let (tx, rx) = watch::channel(None);
        let waiter = tokio::spawn({
            let rx = rx.clone();
            async move { settled(&rx).await }
        });

        tx.send(Some(7)).unwrap();

        assert_eq!(waiter.await.unwrap(), Some(7));
        assert_eq!(settled(&rx).await, Some(7));
    }

    #[tokio::test]
    async fn test_settled_without_value_after_sender_dropped() {
        let (tx, rx) = watch::channel::<Option<u8>>(None);
        drop(tx);
        assert_eq!(settled(&rx).await, None);
    }

    #[tokio::test]
    async fn test_panic_message_from_join_error() {
        let handle = tokio::spawn(async {
            panic!("worker exploded");
        });
        let error = handle.await.unwrap_err();
        assert_eq!(panic_message(error), "worker exploded");
    }
}
