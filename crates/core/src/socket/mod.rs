// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Sockets: typed endpoints through which packets flow between processors.
//!
//! - [`InputSocket`]: receives packets synchronously through a callback
//! - [`OutputSocket`]: fans packets out to connected peers (inputs or further outputs)
//! - [`Socket`]: the closed `{Input, Output}` union used for peer sets and tap back-references
//! - [`SocketBase`]: the attributes and operations both kinds share
//! - [`SocketOwner`]: the processor a socket belongs to (held weakly)
//!
//! ## Transfer contract
//!
//! Transfers are synchronous, depth-first calls: a slow receiver blocks the whole
//! chain back to the producer, and packets on one edge arrive in push order. The
//! boolean result is an acceptance/backpressure signal, never an error code.
//!
//! `is_transferring()` is `true` only while a transfer call is on the stack. It is
//! maintained by a drop guard, so it also resets if a receiver panics.
//!
//! Sockets and their descriptors belong to one execution context; packets cross to
//! worker threads only through the worker task envelope.

mod input;
mod output;

pub use input::{InputSocket, ReceiveCallback};
pub use output::OutputSocket;

use crate::descriptor::{PayloadDescriptor, SocketDescriptor};
use crate::helpers::lock;
use crate::packet::Packet;
use crate::signal::{HandlerReceiver, Signal, SignalHandler, SignalReceiver, SignalResult};
use crate::stats::{SocketStats, SocketStatsTracker};
use crate::tap::SocketTap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Direction of a socket, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketType {
    Input,
    Output,
}

/// Process-unique socket identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SocketId(u64);

impl SocketId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// The processor a socket belongs to.
///
/// Sockets keep only a weak back-reference to their owner. Signals cast to an input
/// socket reach the owner through its [`SignalReceiver`] implementation.
pub trait SocketOwner: SignalReceiver {
    fn own_sockets(&self) -> Vec<Socket>;
}

/// State shared by both socket kinds.
pub struct SocketCore {
    id: SocketId,
    kind: SocketType,
    descriptor: SocketDescriptor,
    transfer_depth: AtomicUsize,
    owner: Mutex<Option<Weak<dyn SocketOwner>>>,
    signal_handler: Mutex<Option<SignalHandler>>,
    tap: Mutex<Option<Arc<dyn SocketTap>>>,
    stats: SocketStatsTracker,
}

impl SocketCore {
    pub(crate) fn new(kind: SocketType, descriptor: SocketDescriptor) -> Self {
        Self {
            id: SocketId::next(),
            kind,
            descriptor,
            transfer_depth: AtomicUsize::new(0),
            owner: Mutex::new(None),
            signal_handler: Mutex::new(None),
            tap: Mutex::new(None),
            stats: SocketStatsTracker::default(),
        }
    }

    pub(crate) fn enter_transfer(&self) -> TransferGuard<'_> {
        self.transfer_depth.fetch_add(1, Ordering::SeqCst);
        TransferGuard(&self.transfer_depth)
    }

    pub(crate) const fn stats(&self) -> &SocketStatsTracker {
        &self.stats
    }

    pub(crate) fn tap(&self) -> Option<Arc<dyn SocketTap>> {
        lock(&self.tap).clone()
    }

    fn replace_tap(&self, tap: Option<Arc<dyn SocketTap>>) -> Option<Arc<dyn SocketTap>> {
        std::mem::replace(&mut *lock(&self.tap), tap)
    }

    /// Clears owner, handler and tap. The detached tap is flushed.
    pub(crate) fn release_references(&self) {
        *lock(&self.owner) = None;
        *lock(&self.signal_handler) = None;
        if let Some(tap) = self.replace_tap(None) {
            tap.set_socket(None);
            tap.flush();
        }
    }

    /// Casts to the owner, the signal handler and the tap, whichever are present.
    async fn cast(&self, signal: &Signal) -> SignalResult {
        let owner = lock(&self.owner).as_ref().and_then(Weak::upgrade).map(OwnerReceiver);
        let handler = lock(&self.signal_handler).clone().map(HandlerReceiver);
        let tap = self.tap().map(TapReceiver);

        let mut receivers: Vec<&dyn SignalReceiver> = Vec::with_capacity(3);
        if let Some(owner) = &owner {
            receivers.push(owner);
        }
        if let Some(handler) = &handler {
            receivers.push(handler);
        }
        if let Some(tap) = &tap {
            receivers.push(tap);
        }

        tracing::trace!(socket_id = %self.id, receivers = receivers.len(), "casting signal");
        signal.emit(&receivers).await
    }
}

/// Marks a socket as transferring for the guard's lifetime.
pub(crate) struct TransferGuard<'a>(&'a AtomicUsize);

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct OwnerReceiver(Arc<dyn SocketOwner>);

#[async_trait]
impl SignalReceiver for OwnerReceiver {
    async fn cast(&self, signal: &Signal) -> SignalResult {
        self.0.cast(signal).await
    }
}

struct TapReceiver(Arc<dyn SocketTap>);

#[async_trait]
impl SignalReceiver for TapReceiver {
    async fn cast(&self, signal: &Signal) -> SignalResult {
        self.0.on_signal(signal).await
    }
}

/// Operations shared by every socket kind.
pub trait SocketBase {
    fn core(&self) -> &SocketCore;

    /// A weak handle to this socket, as held by taps.
    fn downgrade(&self) -> WeakSocket;

    /// Moves everything the tap has released into the downstream path.
    ///
    /// Returns `false` when there is no tap or the socket is closed.
    fn drain_tap(&self) -> bool;

    fn id(&self) -> SocketId {
        self.core().id
    }

    fn socket_type(&self) -> SocketType {
        self.core().kind
    }

    fn descriptor(&self) -> &SocketDescriptor {
        &self.core().descriptor
    }

    /// Snapshot of the shared payload list.
    fn payloads(&self) -> Vec<PayloadDescriptor> {
        self.core().descriptor.payloads()
    }

    fn is_transferring(&self) -> bool {
        self.core().transfer_depth.load(Ordering::SeqCst) > 0
    }

    fn set_owner<O>(&self, owner: &Arc<O>)
    where
        O: SocketOwner + 'static,
        Self: Sized,
    {
        let weak: Weak<O> = Arc::downgrade(owner);
        let weak: Weak<dyn SocketOwner> = weak;
        *lock(&self.core().owner) = Some(weak);
    }

    fn clear_owner(&self) {
        *lock(&self.core().owner) = None;
    }

    /// The owner, if one was set and is still alive.
    fn owner(&self) -> Option<Arc<dyn SocketOwner>> {
        lock(&self.core().owner).as_ref().and_then(Weak::upgrade)
    }

    fn set_signal_handler(&self, handler: Option<SignalHandler>) {
        *lock(&self.core().signal_handler) = handler;
    }

    fn tap(&self) -> Option<Arc<dyn SocketTap>> {
        self.core().tap()
    }

    /// Installs (or removes) the tap. The previous tap is detached but not flushed.
    fn set_tap(&self, tap: Option<Arc<dyn SocketTap>>) {
        let previous = self.core().replace_tap(tap.clone());
        if let Some(previous) = previous {
            previous.set_socket(None);
        }
        if let Some(tap) = tap {
            tap.set_socket(Some(self.downgrade()));
            tracing::debug!(socket_id = %self.id(), "tap attached");
        }
    }

    fn stats(&self) -> SocketStats {
        self.core().stats.snapshot()
    }
}

/// Either kind of socket. Peer sets and taps refer to sockets through this union.
#[derive(Clone)]
pub enum Socket {
    Input(InputSocket),
    Output(OutputSocket),
}

impl Socket {
    /// Delivers `packet`: `transfer_sync` for inputs, fan-out for outputs.
    pub fn transfer(&self, packet: Packet) -> bool {
        match self {
            Self::Input(socket) => socket.transfer_sync(packet),
            Self::Output(socket) => socket.transfer(packet),
        }
    }

    pub const fn as_input(&self) -> Option<&InputSocket> {
        match self {
            Self::Input(socket) => Some(socket),
            Self::Output(_) => None,
        }
    }

    pub const fn as_output(&self) -> Option<&OutputSocket> {
        match self {
            Self::Output(socket) => Some(socket),
            Self::Input(_) => None,
        }
    }

    pub fn close(&self) {
        match self {
            Self::Input(socket) => socket.close(),
            Self::Output(socket) => socket.close(),
        }
    }
}

impl SocketBase for Socket {
    fn core(&self) -> &SocketCore {
        match self {
            Self::Input(socket) => socket.core(),
            Self::Output(socket) => socket.core(),
        }
    }

    fn downgrade(&self) -> WeakSocket {
        match self {
            Self::Input(socket) => socket.downgrade(),
            Self::Output(socket) => socket.downgrade(),
        }
    }

    fn drain_tap(&self) -> bool {
        match self {
            Self::Input(socket) => socket.drain_tap(),
            Self::Output(socket) => socket.drain_tap(),
        }
    }
}

#[async_trait]
impl SignalReceiver for Socket {
    async fn cast(&self, signal: &Signal) -> SignalResult {
        self.core().cast(signal).await
    }
}

impl PartialEq for Socket {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Socket {}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.id())
            .field("type", &self.socket_type())
            .finish_non_exhaustive()
    }
}

impl From<InputSocket> for Socket {
    fn from(socket: InputSocket) -> Self {
        Self::Input(socket)
    }
}

impl From<OutputSocket> for Socket {
    fn from(socket: OutputSocket) -> Self {
        Self::Output(socket)
    }
}

impl From<&InputSocket> for Socket {
    fn from(socket: &InputSocket) -> Self {
        Self::Input(socket.clone())
    }
}

impl From<&OutputSocket> for Socket {
    fn from(socket: &OutputSocket) -> Self {
        Self::Output(socket.clone())
    }
}

/// Non-owning reference to a socket, held by its tap.
#[derive(Clone)]
pub struct WeakSocket(WeakKind);

#[derive(Clone)]
enum WeakKind {
    Input(Weak<input::InputInner>),
    Output(Weak<output::OutputInner>),
}

impl WeakSocket {
    pub fn upgrade(&self) -> Option<Socket> {
        match &self.0 {
            WeakKind::Input(weak) => {
                weak.upgrade().map(|inner| InputSocket::from_inner(inner).into())
            },
            WeakKind::Output(weak) => {
                weak.upgrade().map(|inner| OutputSocket::from_inner(inner).into())
            },
        }
    }
}

impl fmt::Debug for WeakSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alive = match &self.0 {
            WeakKind::Input(weak) => weak.strong_count() > 0,
            WeakKind::Output(weak) => weak.strong_count() > 0,
        };
        f.debug_struct("WeakSocket").field("alive", &alive).finish()
    }
}
