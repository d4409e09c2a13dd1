// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::{Socket, SocketBase, SocketCore, SocketId, SocketType, WeakKind, WeakSocket};
use crate::descriptor::SocketDescriptor;
use crate::helpers::lock;
use crate::packet::Packet;
use crate::signal::{Signal, SignalReceiver, SignalResult};
use crate::tap::TapAction;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, Mutex};

pub(crate) struct OutputInner {
    core: SocketCore,
    peers: Mutex<IndexMap<SocketId, Socket>>,
}

/// The sending end of an edge.
///
/// An output fans every packet out to its peers in connection order. Peers may be
/// inputs or further outputs, which forward in turn. Connections must form a DAG:
/// a cycle of outputs recurses without bound.
#[derive(Clone)]
pub struct OutputSocket {
    inner: Arc<OutputInner>,
}

impl OutputSocket {
    pub fn new(descriptor: SocketDescriptor) -> Self {
        Self {
            inner: Arc::new(OutputInner {
                core: SocketCore::new(SocketType::Output, descriptor),
                peers: Mutex::new(IndexMap::new()),
            }),
        }
    }

    pub(super) const fn from_inner(inner: Arc<OutputInner>) -> Self {
        Self { inner }
    }

    /// Adds `peer` to the fan-out set. Connecting twice is a no-op; connecting a
    /// socket to itself is refused.
    pub fn connect(&self, peer: impl Into<Socket>) -> &Self {
        let peer = peer.into();
        if peer.id() == self.id() {
            tracing::warn!(socket_id = %self.id(), "refusing to connect output socket to itself");
            return self;
        }
        let mut peers = lock(&self.inner.peers);
        if !peers.contains_key(&peer.id()) {
            tracing::debug!(from = %self.id(), to = %peer.id(), "sockets connected");
            peers.insert(peer.id(), peer);
        }
        self
    }

    /// Removes `peer` from the fan-out set. Unknown peers are ignored.
    pub fn disconnect<P: SocketBase>(&self, peer: &P) -> &Self {
        if lock(&self.inner.peers).shift_remove(&peer.id()).is_some() {
            tracing::debug!(from = %self.id(), to = %peer.id(), "sockets disconnected");
        }
        self
    }

    pub fn is_connected_to<P: SocketBase>(&self, peer: &P) -> bool {
        lock(&self.inner.peers).contains_key(&peer.id())
    }

    /// Snapshot of the connected peers, in connection order.
    pub fn peer_sockets(&self) -> Vec<Socket> {
        lock(&self.inner.peers).values().cloned().collect()
    }

    pub fn has_peers(&self) -> bool {
        !lock(&self.inner.peers).is_empty()
    }

    /// Sends a packet to every peer.
    ///
    /// With a tap installed, a held packet reports `true` and is fanned out when the
    /// tap pulls. Otherwise returns `true` iff there is at least one peer and every
    /// peer accepted. All peers are tried even after one refuses.
    pub fn transfer(&self, packet: Packet) -> bool {
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
        self.fan_out(packet)
    }

    fn fan_out(&self, packet: Packet) -> bool {
        // Peers connected during delivery only see later packets
        let peers = self.peer_sockets();
        let Some((last, rest)) = peers.split_last() else {
            tracing::trace!(socket_id = %self.id(), "no peers connected, packet dropped");
            self.inner.core.stats().record(false);
            return false;
        };

        let accepted = {
            let _transferring = self.inner.core.enter_transfer();
            let mut accepted = true;
            for peer in rest {
                accepted &= peer.transfer(packet.clone());
            }
            accepted &= last.transfer(packet);
            accepted
        };

        self.inner.core.stats().record(accepted);
        accepted
    }

    /// Disconnects all peers and flushes and detaches the tap.
    pub fn close(&self) {
        lock(&self.inner.peers).clear();
        self.inner.core.release_references();
        tracing::debug!(socket_id = %self.id(), "output socket closed");
    }
}

impl SocketBase for OutputSocket {
    fn core(&self) -> &SocketCore {
        &self.inner.core
    }

    fn downgrade(&self) -> WeakSocket {
        WeakSocket(WeakKind::Output(Arc::downgrade(&self.inner)))
    }

    fn drain_tap(&self) -> bool {
        let Some(tap) = self.inner.core.tap() else {
            return false;
        };
        while let Some(packet) = tap.pop_packet() {
            self.fan_out(packet);
        }
        true
    }
}

#[async_trait]
impl SignalReceiver for OutputSocket {
    async fn cast(&self, signal: &Signal) -> SignalResult {
        self.inner.core.cast(signal).await
    }
}

impl fmt::Debug for OutputSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSocket")
            .field("id", &self.id())
            .field("peers", &lock(&self.inner.peers).len())
            .field("transferring", &self.is_transferring())
            .finish_non_exhaustive()
    }
}
