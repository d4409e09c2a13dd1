// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::{SocketBase, SocketCore, SocketType, WeakKind, WeakSocket};
use crate::descriptor::SocketDescriptor;
use crate::helpers::lock;
use crate::packet::Packet;
use crate::signal::{Signal, SignalReceiver, SignalResult};
use crate::tap::TapAction;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Receives a packet and reports whether it was accepted.
pub type ReceiveCallback = Arc<dyn Fn(Packet) -> bool + Send + Sync>;

type PacketListener = Arc<dyn Fn(&Packet) + Send + Sync>;
type EosListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default, Clone)]
struct Listeners {
    packet_received: Vec<PacketListener>,
    eos_received: Vec<EosListener>,
}

pub(crate) struct InputInner {
    core: SocketCore,
    receiver: Mutex<Option<ReceiveCallback>>,
    listeners: Mutex<Listeners>,
}

/// The receiving end of an edge.
///
/// Delivery is synchronous: [`InputSocket::transfer_sync`] runs the receive callback
/// on the caller's stack. Once closed, the socket refuses every packet.
#[derive(Clone)]
pub struct InputSocket {
    inner: Arc<InputInner>,
}

impl InputSocket {
    pub fn new(
        descriptor: SocketDescriptor,
        on_receive: impl Fn(Packet) -> bool + Send + Sync + 'static,
    ) -> Self {
        let socket = Self::detached(descriptor);
        socket.set_receive_callback(on_receive);
        socket
    }

    /// An input without a receive callback. It refuses packets until one is set.
    pub fn detached(descriptor: SocketDescriptor) -> Self {
        Self {
            inner: Arc::new(InputInner {
                core: SocketCore::new(SocketType::Input, descriptor),
                receiver: Mutex::new(None),
                listeners: Mutex::new(Listeners::default()),
            }),
        }
    }

    pub(super) const fn from_inner(inner: Arc<InputInner>) -> Self {
        Self { inner }
    }

    pub fn set_receive_callback(
        &self,
        on_receive: impl Fn(Packet) -> bool + Send + Sync + 'static,
    ) {
        *lock(&self.inner.receiver) = Some(Arc::new(on_receive));
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner.receiver).is_none()
    }

    /// Called for every packet handed to the receive callback, after it returns.
    pub fn on_packet_received(&self, listener: impl Fn(&Packet) + Send + Sync + 'static) {
        lock(&self.inner.listeners).packet_received.push(Arc::new(listener));
    }

    /// Called after an end-of-stream packet has been handed to the receive callback.
    pub fn on_eos_received(&self, listener: impl Fn() + Send + Sync + 'static) {
        lock(&self.inner.listeners).eos_received.push(Arc::new(listener));
    }

    fn receive_callback(&self) -> Option<ReceiveCallback> {
        lock(&self.inner.receiver).clone()
    }

    /// Delivers a packet to the receive callback.
    ///
    /// With a tap installed, the tap decides first: a held packet reports `true`
    /// immediately and is delivered later when the tap pulls. Returns `false` when
    /// the socket is closed or the callback refused the packet.
    pub fn transfer_sync(&self, packet: Packet) -> bool {
        let Some(callback) = self.receive_callback() else {
            tracing::trace!(socket_id = %self.id(), "dropping packet on closed input");
            self.inner.core.stats().record(false);
            return false;
        };

        let packet = match self.inner.core.tap() {
            Some(tap) => match tap.push_packet(packet) {
                TapAction::Hold => {
                    self.inner.core.stats().held();
                    return true;
                },
                TapAction::Forward(packet) => packet,
            },
            None => packet,
        };

        self.deliver(&callback, packet)
    }

    fn deliver(&self, callback: &ReceiveCallback, packet: Packet) -> bool {
        let listeners = lock(&self.inner.listeners).clone();
        let is_eos = packet.is_eos();
        let observed = (!listeners.packet_received.is_empty()).then(|| packet.clone());

        let accepted = {
            let _transferring = self.inner.core.enter_transfer();
            let accepted = callback(packet);
            if let Some(packet) = &observed {
                for listener in &listeners.packet_received {
                    listener(packet);
                }
            }
            if is_eos {
                tracing::debug!(socket_id = %self.id(), "end of stream received");
                for listener in &listeners.eos_received {
                    listener();
                }
            }
            accepted
        };

        self.inner.core.stats().record(accepted);
        accepted
    }

    /// Closes the socket: drops the receive callback, owner, handler and listeners,
    /// and flushes and detaches the tap.
    pub fn close(&self) {
        *lock(&self.inner.receiver) = None;
        *lock(&self.inner.listeners) = Listeners::default();
        self.inner.core.release_references();
        tracing::debug!(socket_id = %self.id(), "input socket closed");
    }
}

impl SocketBase for InputSocket {
    fn core(&self) -> &SocketCore {
        &self.inner.core
    }

    fn downgrade(&self) -> WeakSocket {
        WeakSocket(WeakKind::Input(Arc::downgrade(&self.inner)))
    }

    fn drain_tap(&self) -> bool {
        let Some(tap) = self.inner.core.tap() else {
            return false;
        };
        // Re-read the callback per packet: a receiver may close the socket mid-drain
        while let Some(callback) = self.receive_callback() {
            let Some(packet) = tap.pop_packet() else {
                return true;
            };
            self.deliver(&callback, packet);
        }
        false
    }
}

#[async_trait]
impl SignalReceiver for InputSocket {
    async fn cast(&self, signal: &Signal) -> SignalResult {
        self.inner.core.cast(signal).await
    }
}

impl fmt::Debug for InputSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSocket")
            .field("id", &self.id())
            .field("closed", &self.is_closed())
            .field("transferring", &self.is_transferring())
            .finish_non_exhaustive()
    }
}
