// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::queued::{QueueHook, QueuedTap, TapQueues};
use crate::error::{PacketFlowError, Result};
use crate::helpers::{config_helpers, lock};
use crate::options::Configurable;
use crate::packet::Packet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const fn default_enabled() -> bool {
    true
}

const fn default_playback_speed() -> f64 {
    1.0
}

const fn default_poll_period_ms() -> u64 {
    10
}

/// Configuration for [`TimingRegulation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TimingRegulationConfig {
    /// When disabled, packets pass as fast as they arrive.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Media seconds played per wall-clock second.
    #[serde(default = "default_playback_speed")]
    pub playback_speed: f64,
    /// How often waiting packets are re-checked, in milliseconds.
    #[serde(default = "default_poll_period_ms")]
    pub poll_period_ms: u64,
}

impl Default for TimingRegulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            playback_speed: default_playback_speed(),
            poll_period_ms: default_poll_period_ms(),
        }
    }
}

impl TimingRegulationConfig {
    /// # Errors
    ///
    /// Returns an error if the playback speed is not a positive finite number or the
    /// poll period is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.playback_speed.is_finite() || self.playback_speed <= 0.0 {
            return Err(PacketFlowError::Configuration(format!(
                "playback_speed must be positive, got {}",
                self.playback_speed
            )));
        }
        if self.poll_period_ms == 0 {
            return Err(PacketFlowError::Configuration(
                "poll_period_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Wall-clock instant at which media time `dts` (seconds) is due.
#[derive(Debug, Clone, Copy)]
struct PlayoutClock {
    wall: Instant,
    dts: f64,
}

#[derive(Debug)]
struct RegulationState {
    config: Mutex<TimingRegulationConfig>,
    clock: Mutex<Option<PlayoutClock>>,
}

impl RegulationState {
    /// Moves every due packet to the pop queue and returns how many moved.
    ///
    /// A packet is due once `dts <= clock.dts + elapsed * speed`. The first packet
    /// anchors the clock. A decode timestamp earlier than the clock re-anchors it.
    /// Symbolic packets are due immediately.
    fn release_due(&self, queues: &TapQueues, now: Instant) -> usize {
        let config = lock(&self.config).clone();
        let mut clock = lock(&self.clock);

        if !config.enabled {
            let packets = queues.drain_pushed();
            let count = packets.len();
            let last_dts = packets.iter().rev().find_map(media_time);
            for packet in packets {
                queues.release(packet);
            }
            let dts = last_dts.or_else(|| clock.map(|c| c.dts)).unwrap_or_default();
            *clock = Some(PlayoutClock { wall: now, dts });
            return count;
        }

        let mut released = 0;
        while let Some(head) = queues.peek_pushed(media_time) {
            if let Some(dts) = head {
                match *clock {
                    Some(reference) if dts >= reference.dts => {
                        let elapsed = now.saturating_duration_since(reference.wall).as_secs_f64();
                        if dts > reference.dts + elapsed * config.playback_speed {
                            break;
                        }
                        let advance = Duration::try_from_secs_f64(
                            (dts - reference.dts) / config.playback_speed,
                        )
                        .unwrap_or(Duration::ZERO);
                        let wall = reference.wall.checked_add(advance).unwrap_or(now);
                        *clock = Some(PlayoutClock { wall, dts });
                    },
                    Some(reference) => {
                        tracing::debug!(
                            dts,
                            reference_dts = reference.dts,
                            "decode time went backwards, re-anchoring playout clock"
                        );
                        *clock = Some(PlayoutClock { wall: now, dts });
                    },
                    None => *clock = Some(PlayoutClock { wall: now, dts }),
                }
            }
            if let Some(packet) = queues.take_pushed() {
                queues.release(packet);
                released += 1;
            }
        }
        released
    }

    /// Releases due packets and delivers them through the socket.
    fn run(&self, queues: &TapQueues, now: Instant) -> usize {
        let released = self.release_due(queues, now);
        if released > 0 {
            queues.pull();
        }
        released
    }
}

/// Media time of a packet in seconds, `None` for symbolic packets.
fn media_time(packet: &Packet) -> Option<f64> {
    (!packet.is_symbolic()).then(|| packet.normalized_dts())
}

/// Holds packets until the wall clock catches up with their decode timestamps,
/// scaled by the playback speed.
#[derive(Debug)]
pub struct TimingRegulation {
    state: Arc<RegulationState>,
    poller: Mutex<Option<CancellationToken>>,
}

/// A [`QueuedTap`] that plays packets out in real time.
///
/// Packets released by the poll task are delivered from that task, on whichever
/// thread the current tokio runtime schedules it. Use a current-thread runtime, or
/// drive the tap with [`QueuedTap::regulate_at`], to keep delivery on the producer's
/// thread.
pub type TimingRegulationTap = QueuedTap<TimingRegulation>;

impl TimingRegulation {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: TimingRegulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Arc::new(RegulationState {
                config: Mutex::new(config),
                clock: Mutex::new(None),
            }),
            poller: Mutex::new(None),
        })
    }

    pub fn config(&self) -> TimingRegulationConfig {
        lock(&self.state.config).clone()
    }

    /// Starts the poll task if none runs and a tokio runtime is available.
    fn ensure_poller(&self, queues: &Arc<TapQueues>) {
        let mut slot = lock(&self.poller);
        if slot.is_some() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::trace!("no tokio runtime, timing regulation is driven manually");
            return;
        };

        let period = Duration::from_millis(lock(&self.state.config).poll_period_ms);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let state: Weak<RegulationState> = Arc::downgrade(&self.state);
        let queues: Weak<TapQueues> = Arc::downgrade(queues);

        handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let (Some(state), Some(queues)) = (state.upgrade(), queues.upgrade()) else {
                            break;
                        };
                        state.run(&queues, Instant::now());
                    }
                }
            }
        });

        *slot = Some(token);
    }

    fn stop_poller(&self) {
        if let Some(token) = lock(&self.poller).take() {
            token.cancel();
        }
    }
}

impl QueueHook for TimingRegulation {
    fn on_queued(&self, queues: &Arc<TapQueues>) {
        self.ensure_poller(queues);
        self.state.run(queues, Instant::now());
    }

    fn on_flush(&self) {
        *lock(&self.state.clock) = None;
    }
}

impl Drop for TimingRegulation {
    fn drop(&mut self) {
        self.stop_poller();
    }
}

impl QueuedTap<TimingRegulation> {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn timing_regulated(config: TimingRegulationConfig) -> Result<Self> {
        Ok(Self::with_hook(TimingRegulation::new(config)?))
    }

    /// Builds the tap from JSON parameters, using defaults when none are given.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_params(params: Option<&serde_json::Value>) -> Result<Self> {
        Self::timing_regulated(config_helpers::parse_config_optional(params)?)
    }

    /// Releases and delivers every packet due at `now`. Returns how many were released.
    pub fn regulate_at(&self, now: Instant) -> usize {
        self.hook().state.run(self.queues(), now)
    }
}

impl Configurable for QueuedTap<TimingRegulation> {
    type Options = TimingRegulationConfig;

    fn options(&self) -> TimingRegulationConfig {
        self.hook().config()
    }

    fn apply_options(&self, options: TimingRegulationConfig) -> Result<()> {
        options.validate()?;
        let period_changed = {
            let mut config = lock(&self.hook().state.config);
            let changed = config.poll_period_ms != options.poll_period_ms;
            *config = options;
            changed
        };
        tracing::debug!(options = ?self.hook().config(), "timing regulation reconfigured");

        if period_changed {
            self.hook().stop_poller();
            if self.queues().pushed_len() > 0 {
                self.hook().ensure_poller(self.queues());
            }
        }
        self.regulate_at(Instant::now());
        Ok(())
    }
}
