// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Signals: broadcast-and-collect control queries that travel beside the packet path.
//!
//! A [`Signal`] is cast to a list of [`SignalReceiver`]s; each receiver settles with
//! `Ok(bool)` or a [`SignalError`]. [`Signal::emit`] aggregates the results:
//!
//! - no receivers: `Ok(false)`
//! - otherwise waits for *all* receivers, then `Ok(true)` iff at least one said `true`
//! - any failure fails the aggregate (it is not treated as `false`)
//!
//! There is no timeout. A receiver that never settles stalls the aggregate; callers
//! that need a deadline wrap the future themselves (e.g. `tokio::time::timeout`).
//!
//! The [`SignalDirection`] tag is passive metadata for receivers' own routing; the
//! broadcast never filters by it.

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Direction tag carried by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    /// Towards producers.
    Up,
    /// Towards consumers.
    Down,
    /// Not directed.
    Zero,
}

/// Failure reported by a signal receiver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("signal receiver failed: {0}")]
    ReceiverFailed(String),
}

/// Deferred boolean produced by a cast.
pub type SignalResult = Result<bool, SignalError>;

/// A boxed, `'static` cast future, as returned by closures installed as signal handlers.
pub type SignalFuture = BoxFuture<'static, SignalResult>;

/// Closure form of a receiver, installable on sockets.
pub type SignalHandler = Arc<dyn Fn(Signal) -> SignalFuture + Send + Sync>;

/// Anything that can be cast a signal.
///
/// The returned future must always settle eventually, either with a boolean or with
/// an error.
#[async_trait]
pub trait SignalReceiver: Send + Sync {
    async fn cast(&self, signal: &Signal) -> SignalResult;
}

/// An immutable control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    direction: SignalDirection,
    /// Optional label receivers use to recognize the query.
    topic: Option<Arc<str>>,
}

impl Signal {
    pub const fn new(direction: SignalDirection) -> Self {
        Self { direction, topic: None }
    }

    pub fn with_topic(direction: SignalDirection, topic: impl Into<Arc<str>>) -> Self {
        Self { direction, topic: Some(topic.into()) }
    }

    pub const fn direction(&self) -> SignalDirection {
        self.direction
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Casts this signal to every receiver and OR-aggregates the results.
    ///
    /// # Errors
    ///
    /// Returns the first failure (in receiver order) if any receiver failed.
    pub async fn emit(&self, receivers: &[&dyn SignalReceiver]) -> SignalResult {
        if receivers.is_empty() {
            return Ok(false);
        }

        let results = join_all(receivers.iter().map(|receiver| receiver.cast(self))).await;
        aggregate(results)
    }
}

/// OR over successful results; any failure wins.
pub(crate) fn aggregate(results: impl IntoIterator<Item = SignalResult>) -> SignalResult {
    let mut any = false;
    let mut failure = None;
    for result in results {
        match result {
            Ok(value) => any |= value,
            Err(err) => {
                failure.get_or_insert(err);
            },
        }
    }
    failure.map_or(Ok(any), Err)
}

/// Adapts a [`SignalHandler`] closure to the receiver trait.
pub(crate) struct HandlerReceiver(pub SignalHandler);

#[async_trait]
impl SignalReceiver for HandlerReceiver {
    async fn cast(&self, signal: &Signal) -> SignalResult {
        (self.0)(signal.clone()).await
    }
}

/// Builds a [`SignalHandler`] from an async closure.
pub fn signal_handler<F, Fut>(f: F) -> SignalHandler
where
    F: Fn(Signal) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = SignalResult> + Send + 'static,
{
    Arc::new(move |signal| Box::pin(f(signal)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fixed(SignalResult);

    #[async_trait]
    impl SignalReceiver for Fixed {
        async fn cast(&self, _signal: &Signal) -> SignalResult {
            self.0.clone()
        }
    }

    struct Delayed {
        value: bool,
        delay: Duration,
        settled: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SignalReceiver for Delayed {
        async fn cast(&self, _signal: &Signal) -> SignalResult {
            tokio::time::sleep(self.delay).await;
            self.settled.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }
    }

    #[tokio::test]
    async fn test_emit_without_receivers_is_false() {
        let signal = Signal::new(SignalDirection::Zero);
        assert_eq!(signal.emit(&[]).await, Ok(false));
    }

    #[tokio::test]
    async fn test_emit_is_logical_or() {
        let signal = Signal::new(SignalDirection::Down);
        let (f, t) = (Fixed(Ok(false)), Fixed(Ok(true)));

        assert_eq!(signal.emit(&[&f, &f, &t]).await, Ok(true));
        assert_eq!(signal.emit(&[&f, &f]).await, Ok(false));
        assert_eq!(signal.emit(&[&t]).await, Ok(true));
    }

    #[tokio::test]
    async fn test_failure_is_not_treated_as_false() {
        let signal = Signal::new(SignalDirection::Up);
        let failing = Fixed(Err(SignalError::ReceiverFailed("nope".to_string())));
        let t = Fixed(Ok(true));

        let result = signal.emit(&[&t, &failing]).await;
        assert_eq!(result, Err(SignalError::ReceiverFailed("nope".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_waits_for_all_receivers() {
        let settled = Arc::new(AtomicUsize::new(0));
        let fast =
            Delayed { value: true, delay: Duration::from_millis(1), settled: settled.clone() };
        let slow =
            Delayed { value: false, delay: Duration::from_millis(50), settled: settled.clone() };

        let signal = Signal::with_topic(SignalDirection::Zero, "buffered-duration");
        assert_eq!(signal.topic(), Some("buffered-duration"));
        assert_eq!(signal.emit(&[&fast, &slow]).await, Ok(true));
        assert_eq!(settled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_direction_does_not_filter_receivers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handler = HandlerReceiver(signal_handler(move |_signal| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            }
        }));

        for direction in [SignalDirection::Up, SignalDirection::Down, SignalDirection::Zero] {
            Signal::new(direction).emit(&[&handler]).await.unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
