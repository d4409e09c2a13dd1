// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Socket taps: per-socket interceptors that can hold packets and release them later.
//!
//! A tap sees every packet entering its socket through [`SocketTap::push_packet`]. It
//! either forwards the packet unchanged or takes it over ([`TapAction::Hold`]). Held
//! packets are released into the socket's downstream path when the tap calls
//! [`SocketTap::pull`], which drains [`SocketTap::pop_packet`] through the socket.
//!
//! - [`DefaultTap`]: pass-through
//! - [`QueuedTap`]: push queue plus pop queue, with a [`QueueHook`] deciding when
//!   packets move from one to the other
//! - [`TokenBucketTap`]: releases at a configured byte rate
//! - [`TimingRegulationTap`]: releases in step with the packets' decode timestamps
//!
//! A tap refers back to its socket weakly and is detached when the socket closes.

mod queued;
mod timing;
mod token_rate;

pub use queued::{ImmediateRelease, QueueHook, QueuedTap, TapQueues};
pub use timing::{TimingRegulation, TimingRegulationConfig, TimingRegulationTap};
pub use token_rate::{TokenBucketTap, TokenRate};

use crate::helpers::lock;
use crate::packet::Packet;
use crate::signal::{Signal, SignalResult};
use crate::socket::{Socket, SocketBase, WeakSocket};
use async_trait::async_trait;
use std::sync::Mutex;

/// What a tap decided for a pushed packet.
#[derive(Debug)]
pub enum TapAction {
    /// Let the socket handle the packet normally.
    Forward(Packet),
    /// The tap keeps the packet and will release it through [`SocketTap::pull`].
    Hold,
}

impl TapAction {
    pub const fn is_held(&self) -> bool {
        matches!(self, Self::Hold)
    }
}

#[async_trait]
pub trait SocketTap: Send + Sync {
    /// Binds the tap to a socket, or unbinds it with `None`.
    fn set_socket(&self, socket: Option<WeakSocket>);

    /// The bound socket, if any and still alive.
    fn socket(&self) -> Option<Socket>;

    fn push_packet(&self, packet: Packet) -> TapAction;

    /// Next released packet, if any.
    fn pop_packet(&self) -> Option<Packet>;

    /// `true` when the tap holds nothing at all.
    fn is_clear(&self) -> bool;

    /// Discards everything held.
    fn flush(&self);

    /// Moves released packets into the bound socket's downstream path.
    ///
    /// Returns `false` if no socket is bound.
    fn pull(&self) -> bool {
        self.socket().is_some_and(|socket| socket.drain_tap())
    }

    /// Taps answer signals cast to their socket. The default has nothing to say.
    async fn on_signal(&self, _signal: &Signal) -> SignalResult {
        Ok(false)
    }
}

/// Weak back-reference slot shared by the tap implementations.
#[derive(Debug, Default)]
pub(crate) struct SocketSlot(Mutex<Option<WeakSocket>>);

impl SocketSlot {
    pub(crate) fn set(&self, socket: Option<WeakSocket>) {
        *lock(&self.0) = socket;
    }

    pub(crate) fn get(&self) -> Option<Socket> {
        lock(&self.0).as_ref().and_then(WeakSocket::upgrade)
    }
}

/// Pass-through tap. Installing it changes nothing about delivery.
#[derive(Debug, Default)]
pub struct DefaultTap {
    socket: SocketSlot,
}

impl DefaultTap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SocketTap for DefaultTap {
    fn set_socket(&self, socket: Option<WeakSocket>) {
        self.socket.set(socket);
    }

    fn socket(&self) -> Option<Socket> {
        self.socket.get()
    }

    fn push_packet(&self, packet: Packet) -> TapAction {
        TapAction::Forward(packet)
    }

    fn pop_packet(&self) -> Option<Packet> {
        None
    }

    fn is_clear(&self) -> bool {
        true
    }

    fn flush(&self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::descriptor::SocketDescriptor;
    use crate::socket::{InputSocket, OutputSocket};
    use std::sync::Arc;

    #[test]
    fn test_default_tap_is_transparent() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let input = InputSocket::new(SocketDescriptor::default(), move |packet: Packet| {
            sink.lock().unwrap().push(packet.dts());
            true
        });
        let tap = Arc::new(DefaultTap::new());
        input.set_tap(Some(tap.clone()));

        assert!(input.transfer_sync(Packet::from_bytes(vec![0u8], 1)));
        assert_eq!(*received.lock().unwrap(), vec![1]);
        assert!(tap.is_clear());
        assert!(tap.pull());
        assert_eq!(input.stats().held_by_tap, 0);
    }

    #[test]
    fn test_tap_is_bound_weakly() {
        let tap = Arc::new(DefaultTap::new());
        {
            let output = OutputSocket::new(SocketDescriptor::default());
            output.set_tap(Some(tap.clone()));
            assert_eq!(tap.socket().map(|s| s.id()), Some(output.id()));
        }
        assert!(tap.socket().is_none());
        assert!(!tap.pull());
    }

    #[test]
    fn test_replacing_tap_unbinds_previous() {
        let output = OutputSocket::new(SocketDescriptor::default());
        let first = Arc::new(DefaultTap::new());
        let second = Arc::new(DefaultTap::new());
        output.set_tap(Some(first.clone()));
        output.set_tap(Some(second.clone()));
        assert!(first.socket().is_none());
        assert!(second.socket().is_some());

        output.set_tap(None);
        assert!(second.socket().is_none());
        assert!(output.tap().is_none());
    }

    #[tokio::test]
    async fn test_default_tap_answers_signals_with_false() {
        let tap = DefaultTap::new();
        let signal = Signal::new(crate::signal::SignalDirection::Zero);
        assert_eq!(tap.on_signal(&signal).await, Ok(false));
    }
}
