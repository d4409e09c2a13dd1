// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::queued::{QueueHook, QueuedTap, TapQueues};
use crate::error::Result;
use crate::helpers::config_helpers;
use crate::options::Configurable;
use crate::packet::Packet;
use crate::token_bucket::{TokenBucketConfig, TokenBucketPacketQueue};
use std::sync::{Arc, Weak};

/// Releases queued packets at a token-bucket byte rate.
#[derive(Debug)]
pub struct TokenRate {
    bucket: TokenBucketPacketQueue<Packet, Weak<TapQueues>>,
}

/// A [`QueuedTap`] regulated by a token bucket.
///
/// Packets released by the bucket's refill task are delivered from that task, on
/// whichever thread the current tokio runtime schedules it. Use a current-thread
/// runtime, or refill the bucket by hand, to keep delivery on the producer's thread.
pub type TokenBucketTap = QueuedTap<TokenRate>;

impl TokenRate {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: TokenBucketConfig) -> Result<Self> {
        let bucket = TokenBucketPacketQueue::new(config, |packet, queues: Weak<TapQueues>| {
            if let Some(queues) = queues.upgrade() {
                queues.release(packet);
                queues.pull();
            }
        })?;
        Ok(Self { bucket })
    }

    /// The underlying bucket, for rate changes and manual ticks.
    pub const fn bucket(&self) -> &TokenBucketPacketQueue<Packet, Weak<TapQueues>> {
        &self.bucket
    }
}

impl QueueHook for TokenRate {
    fn on_queued(&self, queues: &Arc<TapQueues>) {
        while let Some(packet) = queues.take_pushed() {
            self.bucket.push_packet(packet, Arc::downgrade(queues));
        }
    }

    fn on_flush(&self) {
        self.bucket.reset();
    }

    fn holds_packets(&self) -> bool {
        !self.bucket.is_empty()
    }
}

impl QueuedTap<TokenRate> {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn token_bucket(config: TokenBucketConfig) -> Result<Self> {
        Ok(Self::with_hook(TokenRate::new(config)?))
    }

    /// Builds the tap from JSON parameters. The rate must be given.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` is missing, malformed or invalid.
    pub fn from_params(params: Option<&serde_json::Value>) -> Result<Self> {
        Self::token_bucket(config_helpers::parse_config_required(params)?)
    }

    pub const fn bucket(&self) -> &TokenBucketPacketQueue<Packet, Weak<TapQueues>> {
        self.hook().bucket()
    }
}

impl Configurable for QueuedTap<TokenRate> {
    type Options = TokenBucketConfig;

    fn options(&self) -> TokenBucketConfig {
        self.bucket().config()
    }

    fn apply_options(&self, options: TokenBucketConfig) -> Result<()> {
        self.bucket().reconfigure(options)
    }
}
