// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Token-bucket rate regulation for queued packets.
//!
//! [`TokenBucketPacketQueue`] holds items in FIFO order and releases the head once
//! the bucket holds at least as many tokens as the head's byte length. Tokens refill
//! at `token_rate` per second, capped at `max_tokens`. A non-conformant head may be
//! dropped at random instead of waiting (`drop_probability`).
//!
//! Refills happen on a periodic tokio task that is started lazily on the first push
//! when a runtime is available. Without a runtime the owner drives the bucket by
//! calling [`TokenBucketPacketQueue::tick`].
//!
//! - Precise clock: each refill adds `rate * elapsed` based on the monotonic clock
//! - Cheap clock: each refill adds `rate * period` for a fixed nominal period,
//!   trading precision for not reading the clock

use crate::error::{PacketFlowError, Result};
use crate::helpers::lock;
use crate::packet::{BufferSlice, Packet};
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Byte length used to charge tokens for an item.
pub trait ByteLength {
    fn byte_length(&self) -> usize;
}

impl ByteLength for Packet {
    fn byte_length(&self) -> usize {
        Self::byte_length(self)
    }
}

impl ByteLength for BufferSlice {
    fn byte_length(&self) -> usize {
        self.len()
    }
}

impl ByteLength for Bytes {
    fn byte_length(&self) -> usize {
        self.len()
    }
}

impl ByteLength for Vec<u8> {
    fn byte_length(&self) -> usize {
        self.len()
    }
}

const fn default_tick_period_ms() -> u64 {
    10
}

const fn default_cheap_clock_period_ms() -> u64 {
    100
}

/// Configuration for a [`TokenBucketPacketQueue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TokenBucketConfig {
    /// Tokens (bytes) added per second. Must be a whole number.
    pub token_rate: f64,
    /// Bucket capacity in tokens. Unbounded when unset.
    pub max_tokens: Option<u64>,
    /// Probability in `[0, 1]` of dropping a head that cannot be released yet.
    pub drop_probability: f64,
    /// Refill by a fixed nominal amount per period instead of measuring elapsed time.
    pub use_cheap_clock: bool,
    /// Refill period of the precise clock, in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    /// Refill period of the cheap clock, in milliseconds.
    #[serde(default = "default_cheap_clock_period_ms")]
    pub cheap_clock_period_ms: u64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            token_rate: 0.0,
            max_tokens: None,
            drop_probability: 0.0,
            use_cheap_clock: false,
            tick_period_ms: default_tick_period_ms(),
            cheap_clock_period_ms: default_cheap_clock_period_ms(),
        }
    }
}

impl TokenBucketConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the drop probability lies outside `[0, 1]`, the token rate
    /// is negative, fractional or not finite, or a refill period is zero.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.drop_probability) {
            return Err(PacketFlowError::Configuration(format!(
                "drop_probability must be within [0, 1], got {}",
                self.drop_probability
            )));
        }
        whole_token_rate(self.token_rate)?;
        if self.tick_period_ms == 0 || self.cheap_clock_period_ms == 0 {
            return Err(PacketFlowError::Configuration(
                "refill periods must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The period of the refill task for the selected clock.
    pub const fn refill_period(&self) -> Duration {
        if self.use_cheap_clock {
            Duration::from_millis(self.cheap_clock_period_ms)
        } else {
            Duration::from_millis(self.tick_period_ms)
        }
    }
}

fn whole_token_rate(rate: f64) -> Result<f64> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(PacketFlowError::Configuration(format!(
            "token_rate must be a finite non-negative number, got {rate}"
        )));
    }
    if rate.fract() != 0.0 {
        return Err(PacketFlowError::Configuration(format!(
            "token_rate must be a whole number of tokens per second, got {rate}"
        )));
    }
    Ok(rate)
}

/// Queue discipline parameters. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct QueueDiscipline {
    pub drop_probability: Option<f64>,
}

/// Invoked with each released item and the context it was pushed with.
pub type PopCallback<P, C> = Arc<dyn Fn(P, C) + Send + Sync>;

type RandomSource = Box<dyn FnMut() -> f64 + Send>;

struct BucketState<P, C> {
    config: TokenBucketConfig,
    tokens: f64,
    queue: VecDeque<(P, C)>,
    last_refill: Instant,
    random: RandomSource,
    popped: u64,
    dropped: u64,
}

impl<P: ByteLength, C> BucketState<P, C> {
    #[allow(clippy::cast_precision_loss)]
    fn add_tokens(&mut self, amount: f64) {
        let cap = self.config.max_tokens.map_or(f64::INFINITY, |max| max as f64);
        self.tokens = (self.tokens + amount).min(cap);
    }

    fn refill_at(&mut self, now: Instant) {
        let amount = if self.config.use_cheap_clock {
            self.config.token_rate * self.config.refill_period().as_secs_f64()
        } else {
            self.config.token_rate * now.saturating_duration_since(self.last_refill).as_secs_f64()
        };
        self.last_refill = now;
        self.add_tokens(amount);
    }

    /// Pops every head the bucket can pay for, dropping non-conformant heads per the
    /// drop probability.
    #[allow(clippy::cast_precision_loss)]
    fn take_conformant(&mut self) -> Vec<(P, C)> {
        let mut released = Vec::new();
        while let Some((head, _)) = self.queue.front() {
            let cost = head.byte_length() as f64;
            if self.tokens >= cost {
                self.tokens -= cost;
                self.popped += 1;
                if let Some(item) = self.queue.pop_front() {
                    released.push(item);
                }
                continue;
            }

            let p = self.config.drop_probability;
            if p > 0.0 && (self.random)() <= p {
                self.queue.pop_front();
                self.dropped += 1;
                tracing::debug!(
                    cost,
                    tokens = self.tokens,
                    queued = self.queue.len(),
                    "dropping non-conformant packet"
                );
                continue;
            }
            break;
        }
        released
    }
}

struct BucketShared<P, C> {
    state: Mutex<BucketState<P, C>>,
    on_pop: PopCallback<P, C>,
}

impl<P: ByteLength, C> BucketShared<P, C> {
    /// Releases what the bucket can pay for. The callback runs without the lock held.
    fn process(&self) -> usize {
        let released = lock(&self.state).take_conformant();
        let count = released.len();
        for (item, context) in released {
            (self.on_pop)(item, context);
        }
        count
    }

    fn tick_at(&self, now: Instant) -> usize {
        lock(&self.state).refill_at(now);
        self.process()
    }
}

/// A FIFO of `(item, context)` pairs released at a token-bucket rate.
///
/// `C` is an opaque context handed back to the pop callback with each item.
///
/// Inside a tokio runtime a refill task is spawned on it, and items released by a
/// refill reach the pop callback from that task. Without a runtime the queue only
/// moves when [`tick`](Self::tick) or [`refill`](Self::refill) is called.
pub struct TokenBucketPacketQueue<P, C = ()> {
    shared: Arc<BucketShared<P, C>>,
    refill_task: Mutex<Option<CancellationToken>>,
}

impl<P, C> TokenBucketPacketQueue<P, C>
where
    P: ByteLength + Send + 'static,
    C: Send + 'static,
{
    /// Creates an empty queue with an empty bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        config: TokenBucketConfig,
        on_pop: impl Fn(P, C) + Send + Sync + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(BucketShared {
                state: Mutex::new(BucketState {
                    config,
                    tokens: 0.0,
                    queue: VecDeque::new(),
                    last_refill: Instant::now(),
                    random: Box::new(rand::random::<f64>),
                    popped: 0,
                    dropped: 0,
                }),
                on_pop: Arc::new(on_pop),
            }),
            refill_task: Mutex::new(None),
        })
    }

    /// Replaces the uniform `[0, 1)` source used for drop decisions.
    #[must_use]
    pub fn with_random_source(self, random: impl FnMut() -> f64 + Send + 'static) -> Self {
        lock(&self.shared.state).random = Box::new(random);
        self
    }

    /// Enqueues an item and releases whatever is conformant right away.
    pub fn push_packet(&self, packet: P, context: C) {
        lock(&self.shared.state).queue.push_back((packet, context));
        self.ensure_refill_task();
        self.shared.process();
    }

    /// One refill step at the current time, followed by release processing.
    /// Returns the number of items released.
    pub fn tick(&self) -> usize {
        self.tick_at(Instant::now())
    }

    /// One refill step as of `now`.
    pub fn tick_at(&self, now: Instant) -> usize {
        self.shared.tick_at(now)
    }

    /// Adds tokens directly (capped at `max_tokens`) and processes the queue.
    #[allow(clippy::cast_precision_loss)]
    pub fn refill(&self, tokens: u64) -> usize {
        lock(&self.shared.state).add_tokens(tokens as f64);
        self.shared.process()
    }

    /// Empties the queue and the bucket. Counters are kept.
    pub fn reset(&self) {
        let mut state = lock(&self.shared.state);
        state.queue.clear();
        state.tokens = 0.0;
        state.last_refill = Instant::now();
    }

    /// Applies queue discipline changes and returns the resulting discipline.
    ///
    /// # Errors
    ///
    /// Returns an error if the drop probability lies outside `[0, 1]`.
    pub fn configure_queue_discipline(
        &self,
        discipline: QueueDiscipline,
    ) -> Result<QueueDiscipline> {
        let mut state = lock(&self.shared.state);
        if let Some(p) = discipline.drop_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(PacketFlowError::Configuration(format!(
                    "drop_probability must be within [0, 1], got {p}"
                )));
            }
            state.config.drop_probability = p;
        }
        Ok(QueueDiscipline { drop_probability: Some(state.config.drop_probability) })
    }

    /// Sets the rate from bits per second, rounded to whole bytes per second.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting rate is negative or not finite.
    pub fn set_avg_rate_in_bits_per_sec(&self, bits_per_sec: f64) -> Result<()> {
        self.set_token_rate((bits_per_sec / 8.0).round())
    }

    /// Sets the refill rate in tokens per second.
    ///
    /// # Errors
    ///
    /// Returns an error for fractional, negative or non-finite rates. The previous
    /// rate stays in effect.
    pub fn set_token_rate(&self, token_rate: f64) -> Result<()> {
        let token_rate = whole_token_rate(token_rate)?;
        let now = Instant::now();
        {
            // Settle tokens earned at the old rate first
            let mut state = lock(&self.shared.state);
            if !state.config.use_cheap_clock {
                state.refill_at(now);
            }
            state.config.token_rate = token_rate;
        }
        tracing::debug!(token_rate, "token rate updated");
        self.shared.process();
        Ok(())
    }

    pub fn set_max_tokens(&self, max_tokens: Option<u64>) {
        let mut state = lock(&self.shared.state);
        state.config.max_tokens = max_tokens;
        state.add_tokens(0.0);
    }

    /// Replaces the whole configuration, restarting the refill task if it runs.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation. The previous configuration
    /// stays in effect.
    pub fn reconfigure(&self, config: TokenBucketConfig) -> Result<()> {
        config.validate()?;
        {
            let mut state = lock(&self.shared.state);
            state.refill_at(Instant::now());
            state.config = config;
            state.add_tokens(0.0);
        }
        if self.cancel_refill_task() {
            self.ensure_refill_task();
        }
        self.shared.process();
        Ok(())
    }

    pub fn config(&self) -> TokenBucketConfig {
        lock(&self.shared.state).config.clone()
    }

    /// How long the bucket can sustain `max_rate` before running dry, starting full.
    ///
    /// `None` if the bucket is unbounded or `max_rate` does not exceed the token rate.
    #[allow(clippy::cast_precision_loss)]
    pub fn max_burst_time(&self, max_rate: f64) -> Option<Duration> {
        let state = lock(&self.shared.state);
        let max_tokens = state.config.max_tokens?;
        let excess = max_rate - state.config.token_rate;
        if excess <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(max_tokens as f64 / excess).ok()
    }

    /// Bytes sent at `max_rate` during [`Self::max_burst_time`].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_burst_size(&self, max_rate: f64) -> Option<u64> {
        self.max_burst_time(max_rate).map(|burst| (burst.as_secs_f64() * max_rate).round() as u64)
    }

    pub fn tokens(&self) -> f64 {
        lock(&self.shared.state).tokens
    }

    pub fn len(&self) -> usize {
        lock(&self.shared.state).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.shared.state).queue.is_empty()
    }

    /// Items released so far.
    pub fn popped(&self) -> u64 {
        lock(&self.shared.state).popped
    }

    /// Items dropped so far.
    pub fn dropped(&self) -> u64 {
        lock(&self.shared.state).dropped
    }

    /// Whether the periodic refill task is running.
    pub fn is_scheduled(&self) -> bool {
        lock(&self.refill_task).is_some()
    }

    /// Starts the periodic refill task if none runs and a tokio runtime is available.
    fn ensure_refill_task(&self) {
        let mut slot = lock(&self.refill_task);
        if slot.is_some() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::trace!("no tokio runtime, token bucket refills are driven manually");
            return;
        };

        let period = lock(&self.shared.state).config.refill_period();
        let token = CancellationToken::new();
        let shared: Weak<BucketShared<P, C>> = Arc::downgrade(&self.shared);
        let cancelled = token.clone();

        handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(shared) = shared.upgrade() else { break };
                        shared.tick_at(Instant::now());
                    }
                }
            }
            tracing::trace!("token bucket refill task stopped");
        });

        tracing::debug!(period_ms = period.as_millis(), "token bucket refill task started");
        *slot = Some(token);
    }

    fn cancel_refill_task(&self) -> bool {
        lock(&self.refill_task).take().map(|token| token.cancel()).is_some()
    }
}

impl<P, C> Drop for TokenBucketPacketQueue<P, C> {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.refill_task).take() {
            token.cancel();
        }
    }
}

impl<P, C> std::fmt::Debug for TokenBucketPacketQueue<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("TokenBucketPacketQueue")
            .field("config", &state.config)
            .field("tokens", &state.tokens)
            .field("queued", &state.queue.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    type Released = Arc<Mutex<Vec<(usize, u32)>>>;

    fn bucket(config: TokenBucketConfig) -> (TokenBucketPacketQueue<Vec<u8>, u32>, Released) {
        let released: Released = Arc::new(Mutex::new(Vec::new()));
        let sink = released.clone();
        let queue = TokenBucketPacketQueue::new(config, move |packet: Vec<u8>, tag| {
            sink.lock().unwrap().push((packet.len(), tag));
        })
        .unwrap();
        (queue, released)
    }

    fn rate(token_rate: f64) -> TokenBucketConfig {
        TokenBucketConfig { token_rate, ..Default::default() }
    }

    #[test]
    fn test_head_waits_for_enough_tokens() {
        let (queue, released) = bucket(rate(1000.0));
        queue.push_packet(vec![0; 100], 1);
        assert!(released.lock().unwrap().is_empty());

        queue.refill(50);
        assert!(released.lock().unwrap().is_empty());
        queue.refill(50);
        assert_eq!(*released.lock().unwrap(), vec![(100, 1)]);
        assert_eq!(queue.tokens(), 0.0);
        assert_eq!(queue.popped(), 1);
    }

    #[test]
    fn test_fifo_order_is_preserved() {
        let (queue, released) = bucket(rate(1000.0));
        queue.push_packet(vec![0; 10], 1);
        queue.push_packet(vec![0; 1], 2);
        queue.push_packet(vec![0; 10], 3);

        // The small second item never overtakes the head
        queue.refill(5);
        assert!(released.lock().unwrap().is_empty());
        queue.refill(16);
        assert_eq!(*released.lock().unwrap(), vec![(10, 1), (1, 2), (10, 3)]);
    }

    #[test]
    fn test_tokens_are_capped() {
        let (queue, _) = bucket(TokenBucketConfig { max_tokens: Some(64), ..rate(1000.0) });
        queue.refill(1000);
        assert_eq!(queue.tokens(), 64.0);

        queue.set_max_tokens(Some(10));
        assert_eq!(queue.tokens(), 10.0);
    }

    #[test]
    fn test_precise_refill_uses_elapsed_time() {
        let (queue, released) = bucket(rate(1000.0));
        queue.push_packet(vec![0; 100], 7);
        let start = Instant::now();
        queue.tick_at(start + Duration::from_millis(50));
        assert!(released.lock().unwrap().is_empty());
        queue.tick_at(start + Duration::from_millis(100));
        assert_eq!(released.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cheap_clock_adds_nominal_amount() {
        let config = TokenBucketConfig {
            use_cheap_clock: true,
            cheap_clock_period_ms: 100,
            ..rate(1000.0)
        };
        let (queue, _) = bucket(config);
        let now = Instant::now();
        queue.tick_at(now);
        queue.tick_at(now);
        assert_eq!(queue.tokens(), 200.0);
    }

    #[test]
    fn test_drop_probability_one_drops_every_nonconformant_head() {
        let (queue, released) = bucket(TokenBucketConfig { drop_probability: 1.0, ..rate(10.0) });
        queue.push_packet(vec![0; 100], 1);
        queue.push_packet(vec![0; 100], 2);
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 2);
        assert!(released.lock().unwrap().is_empty());

        // Conformant items still go through
        queue.refill(5);
        queue.push_packet(vec![0; 5], 3);
        assert_eq!(*released.lock().unwrap(), vec![(5, 3)]);
    }

    #[test]
    fn test_drop_probability_zero_never_drops() {
        let (queue, _) = bucket(rate(10.0));
        let queue = queue.with_random_source(|| 0.0);
        queue.push_packet(vec![0; 100], 1);
        assert_eq!(queue.dropped(), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_empty_bucket_holds_until_discipline_drops() {
        let (queue, released) = bucket(TokenBucketConfig {
            token_rate: 0.0,
            max_tokens: Some(0),
            drop_probability: 0.0,
            ..Default::default()
        });
        queue.push_packet(vec![0; 1], 1);
        for _ in 0..5 {
            queue.tick();
        }
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.popped(), 0);

        queue
            .configure_queue_discipline(QueueDiscipline { drop_probability: Some(1.0) })
            .unwrap();
        queue.tick();
        assert!(queue.is_empty());
        assert_eq!(queue.popped(), 0);
        assert_eq!(queue.dropped(), 1);
        assert!(released.lock().unwrap().is_empty());
    }

    #[test]
    fn test_random_draw_decides_drops() {
        let (queue, _) = bucket(TokenBucketConfig { drop_probability: 0.5, ..rate(10.0) });
        let draws = Arc::new(Mutex::new(vec![0.9, 0.2].into_iter()));
        let queue = queue.with_random_source(move || draws.lock().unwrap().next().unwrap_or(1.0));

        queue.push_packet(vec![0; 100], 1);
        assert_eq!(queue.len(), 1);
        queue.tick_at(Instant::now());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn test_configuration_is_validated() {
        assert!(TokenBucketPacketQueue::<Vec<u8>>::new(
            TokenBucketConfig { drop_probability: 1.5, ..Default::default() },
            |_, ()| {}
        )
        .is_err());
        assert!(TokenBucketPacketQueue::<Vec<u8>>::new(rate(10.5), |_, ()| {}).is_err());

        let (queue, _) = bucket(rate(10.0));
        assert!(queue.set_token_rate(2.5).is_err());
        assert_eq!(queue.config().token_rate, 10.0);
        let negative = QueueDiscipline { drop_probability: Some(-0.1) };
        assert!(queue.configure_queue_discipline(negative).is_err());
    }

    #[test]
    fn test_queue_discipline_reports_current_value() {
        let (queue, _) = bucket(rate(10.0));
        let current = queue.configure_queue_discipline(QueueDiscipline::default()).unwrap();
        assert_eq!(current.drop_probability, Some(0.0));
        let current = queue
            .configure_queue_discipline(QueueDiscipline { drop_probability: Some(0.25) })
            .unwrap();
        assert_eq!(current.drop_probability, Some(0.25));
    }

    #[test]
    fn test_bits_per_second_are_rounded_to_bytes() {
        let (queue, _) = bucket(rate(0.0));
        queue.set_avg_rate_in_bits_per_sec(8_004.0).unwrap();
        assert_eq!(queue.config().token_rate, 1001.0);
    }

    #[test]
    fn test_max_burst() {
        let (queue, _) = bucket(TokenBucketConfig { max_tokens: Some(1000), ..rate(500.0) });
        assert_eq!(queue.max_burst_time(1500.0), Some(Duration::from_secs(1)));
        assert_eq!(queue.max_burst_size(1500.0), Some(1500));
        assert_eq!(queue.max_burst_time(500.0), None);

        let (unbounded, _) = bucket(rate(500.0));
        assert_eq!(unbounded.max_burst_time(1500.0), None);
    }

    #[test]
    fn test_reset_empties_queue_and_bucket() {
        let (queue, released) = bucket(rate(10.0));
        queue.refill(5);
        queue.push_packet(vec![0; 100], 1);
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.tokens(), 0.0);
        queue.refill(100);
        assert!(released.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_length_items_pass_immediately() {
        let (queue, released) = bucket(rate(0.0));
        queue.push_packet(Vec::new(), 9);
        assert_eq!(*released.lock().unwrap(), vec![(0, 9)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_task_releases_over_time() {
        let (queue, released) = bucket(rate(1000.0));
        queue.push_packet(vec![0; 100], 1);
        assert!(queue.is_scheduled());
        assert!(released.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(released.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_no_refill_task_without_runtime() {
        let (queue, _) = bucket(rate(1000.0));
        queue.push_packet(vec![0; 100], 1);
        assert!(!queue.is_scheduled());
    }
}
