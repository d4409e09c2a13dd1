// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The worker task envelope.
//!
//! A [`WorkerTask`] carries a worker context, a task name and a [`Packet`] to a worker
//! thread. Building the envelope moves the packet: its byte storage travels with it
//! and the sender keeps no handle to it. The envelope records a [`TransferList`] of
//! the distinct buffers that moved, so both sides can verify nothing was copied.

use crate::error::WorkerError;
use packetflow_core::packet::BufferId;
use packetflow_core::Packet;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Names of the operations workers understand.
///
/// The set is open: applications register further names with the task registry.
pub mod task_names {
    /// Split container data into elementary stream packets.
    pub const DEMUX: &str = "demux";
}

/// Identifies the worker a task is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WorkerContext {
    id: u64,
    name: Arc<str>,
}

impl WorkerContext {
    pub fn new(id: u64, name: impl Into<Arc<str>>) -> Self {
        Self { id, name: name.into() }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// The distinct underlying buffers whose ownership moves with a packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferList {
    buffers: Vec<BufferId>,
    byte_length: usize,
}

impl TransferList {
    pub fn of(packet: &Packet) -> Self {
        let buffers = packet.buffer_ids();
        let byte_length = buffers.iter().map(BufferId::byte_length).sum();
        Self { buffers, byte_length }
    }

    pub fn buffers(&self) -> &[BufferId] {
        &self.buffers
    }

    /// Total size of the transferred buffers (not just the sliced windows).
    pub const fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn contains(&self, id: &BufferId) -> bool {
        self.buffers.contains(id)
    }
}

/// Outbound envelope: `{ context, name, packet }`.
#[derive(Debug)]
pub struct WorkerTask {
    context: WorkerContext,
    name: String,
    packet: Packet,
    transfer: TransferList,
}

impl WorkerTask {
    pub fn new(context: WorkerContext, name: impl Into<String>, packet: Packet) -> Self {
        let transfer = TransferList::of(&packet);
        Self { context, name: name.into(), packet, transfer }
    }

    pub const fn context(&self) -> &WorkerContext {
        &self.context
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn packet(&self) -> &Packet {
        &self.packet
    }

    pub const fn transfer_list(&self) -> &TransferList {
        &self.transfer
    }

    pub fn into_parts(self) -> (WorkerContext, String, Packet) {
        (self.context, self.name, self.packet)
    }
}

/// Inbound messages posted back by a worker.
#[derive(Debug)]
pub enum WorkerMessage {
    /// A packet produced by task number `job`.
    Result { context: WorkerContext, job: u64, packet: Packet },
    /// Task number `job` was aborted.
    Failed { context: WorkerContext, job: u64, name: String, error: WorkerError },
}

impl WorkerMessage {
    pub const fn job(&self) -> u64 {
        match self {
            Self::Result { job, .. } | Self::Failed { job, .. } => *job,
        }
    }

    pub fn into_packet(self) -> Option<Packet> {
        match self {
            Self::Result { packet, .. } => Some(packet),
            Self::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use packetflow_core::BufferSlice;

    #[test]
    fn test_transfer_list_counts_distinct_buffers() {
        let storage = Bytes::from(vec![0u8; 64]);
        let slices = [
            BufferSlice::new(storage.clone()).sub_slice(0, 10).unwrap(),
            BufferSlice::new(storage).sub_slice(10, 10).unwrap(),
            BufferSlice::new(vec![1u8; 8]),
        ];
        let packet = Packet::from_slices(slices, 0);

        let task = WorkerTask::new(WorkerContext::new(1, "decoder"), task_names::DEMUX, packet);
        assert_eq!(task.transfer_list().buffers().len(), 2);
        assert_eq!(task.transfer_list().byte_length(), 72);
        assert_eq!(task.name(), "demux");
        assert_eq!(task.context().to_string(), "decoder#1");
    }

    #[test]
    fn test_symbolic_packets_transfer_nothing() {
        let task = WorkerTask::new(WorkerContext::new(2, "w"), "flush", Packet::flush());
        assert_eq!(task.transfer_list(), &TransferList::default());
    }
}
