// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use super::{SocketSlot, SocketTap, TapAction};
use crate::helpers::lock;
use crate::packet::Packet;
use crate::socket::{Socket, SocketBase, WeakSocket};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// The two queues of a [`QueuedTap`] plus its socket binding.
///
/// Packets enter the push queue, a [`QueueHook`] moves them to the pop queue, and
/// [`TapQueues::pull`] delivers the pop queue through the bound socket. Hooks that
/// release from timers hold this behind an `Arc` (or a `Weak` of it).
#[derive(Debug, Default)]
pub struct TapQueues {
    push_queue: Mutex<VecDeque<Packet>>,
    pop_queue: Mutex<VecDeque<Packet>>,
    socket: SocketSlot,
}

impl TapQueues {
    pub fn enqueue(&self, packet: Packet) {
        lock(&self.push_queue).push_back(packet);
    }

    /// Removes the oldest waiting packet.
    pub fn take_pushed(&self) -> Option<Packet> {
        lock(&self.push_queue).pop_front()
    }

    /// Inspects the oldest waiting packet without removing it.
    pub fn peek_pushed<R>(&self, f: impl FnOnce(&Packet) -> R) -> Option<R> {
        lock(&self.push_queue).front().map(f)
    }

    pub fn drain_pushed(&self) -> Vec<Packet> {
        lock(&self.push_queue).drain(..).collect()
    }

    pub fn pushed_len(&self) -> usize {
        lock(&self.push_queue).len()
    }

    /// Makes a packet available to [`SocketTap::pop_packet`].
    pub fn release(&self, packet: Packet) {
        lock(&self.pop_queue).push_back(packet);
    }

    /// Moves every waiting packet to the pop queue. Returns how many moved.
    pub fn release_all_pushed(&self) -> usize {
        let packets = self.drain_pushed();
        let count = packets.len();
        lock(&self.pop_queue).extend(packets);
        count
    }

    pub fn released_len(&self) -> usize {
        lock(&self.pop_queue).len()
    }

    fn pop_released(&self) -> Option<Packet> {
        lock(&self.pop_queue).pop_front()
    }

    /// `true` when both queues are empty.
    pub fn is_clear(&self) -> bool {
        lock(&self.push_queue).is_empty() && lock(&self.pop_queue).is_empty()
    }

    fn clear(&self) {
        lock(&self.push_queue).clear();
        lock(&self.pop_queue).clear();
    }

    pub fn socket(&self) -> Option<Socket> {
        self.socket.get()
    }

    /// Delivers released packets through the bound socket. Never call with a queue
    /// lock held: delivery re-enters the tap.
    pub fn pull(&self) -> bool {
        self.socket().is_some_and(|socket| socket.drain_tap())
    }
}

/// Decides when packets move from the push queue to the pop queue.
pub trait QueueHook: Send + Sync + 'static {
    /// Called after each packet has been enqueued.
    fn on_queued(&self, queues: &Arc<TapQueues>);

    /// Called after both queues were cleared.
    fn on_flush(&self) {}

    /// Whether the hook itself still holds packets outside the two queues.
    fn holds_packets(&self) -> bool {
        false
    }
}

/// Releases every packet as soon as it is queued. Delivery still waits for a pull.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateRelease;

impl QueueHook for ImmediateRelease {
    fn on_queued(&self, queues: &Arc<TapQueues>) {
        queues.release_all_pushed();
    }
}

/// A tap that holds every packet in its queues.
///
/// With [`ImmediateRelease`] packets become poppable at once but are only delivered
/// when someone calls [`SocketTap::pull`]. Other hooks release on their own schedule
/// and pull themselves.
#[derive(Debug)]
pub struct QueuedTap<H: QueueHook = ImmediateRelease> {
    queues: Arc<TapQueues>,
    hook: H,
}

impl QueuedTap {
    pub fn new() -> Self {
        Self::with_hook(ImmediateRelease)
    }
}

impl Default for QueuedTap {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: QueueHook> QueuedTap<H> {
    pub fn with_hook(hook: H) -> Self {
        Self { queues: Arc::new(TapQueues::default()), hook }
    }

    pub const fn hook(&self) -> &H {
        &self.hook
    }

    pub const fn queues(&self) -> &Arc<TapQueues> {
        &self.queues
    }
}

impl<H: QueueHook> SocketTap for QueuedTap<H> {
    fn set_socket(&self, socket: Option<WeakSocket>) {
        self.queues.socket.set(socket);
    }

    fn socket(&self) -> Option<Socket> {
        self.queues.socket()
    }

    fn push_packet(&self, packet: Packet) -> TapAction {
        self.queues.enqueue(packet);
        self.hook.on_queued(&self.queues);
        TapAction::Hold
    }

    fn pop_packet(&self) -> Option<Packet> {
        self.queues.pop_released()
    }

    fn is_clear(&self) -> bool {
        self.queues.is_clear() && !self.hook.holds_packets()
    }

    fn flush(&self) {
        self.queues.clear();
        self.hook.on_flush();
    }

    fn pull(&self) -> bool {
        self.queues.pull()
    }
}
