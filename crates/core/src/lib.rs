// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packetflow Core - the dataflow substrate for real-time media processing.
//!
//! Processors exchange [`Packet`]s through typed sockets. An [`OutputSocket`] fans
//! packets out to connected [`InputSocket`]s (or further outputs); delivery is a
//! synchronous call whose boolean result signals acceptance. Control queries travel
//! beside the packets as [`Signal`]s, OR-aggregated over every receiver.
//!
//! ## Core Modules
//!
//! - [`packet`]: Packets, buffer slices and their timing
//! - [`descriptor`]: Shared payload descriptors for sockets
//! - [`socket`]: Input/output sockets, peers and ownership
//! - [`signal`]: Signals and the receiver contract
//! - [`tap`]: Socket taps (pass-through, queued, token-rate, timing regulation)
//! - [`token_bucket`]: Token-bucket packet queue
//! - [`options`]: Runtime-adjustable option records
//! - [`stats`]: Per-socket transfer counters
//! - [`error`]: Error types and handling
//! - [`helpers`]: Utility functions for configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use packetflow_core::{InputSocket, OutputSocket, Packet, SocketDescriptor};
//!
//! let descriptor = SocketDescriptor::default();
//! let input = InputSocket::new(descriptor.clone(), |packet| packet.byte_length() > 0);
//! let output = OutputSocket::new(descriptor);
//! output.connect(&input);
//!
//! assert!(output.transfer(Packet::from_bytes(vec![1u8, 2, 3], 0)));
//! ```

// Re-export async_trait for use in receiver implementations
pub use async_trait::async_trait;

// Module declarations
pub mod descriptor;
pub mod error;
pub mod helpers;
pub mod options;
pub mod packet;
pub mod signal;
pub mod socket;
pub mod stats;
pub mod tap;
pub mod token_bucket;

// Error handling
pub use error::{PacketFlowError, Result};

// Packets
pub use packet::{BufferProperties, BufferSlice, Packet, PacketPayload, PacketSymbol};

// Sockets
pub use descriptor::{PayloadDescriptor, SocketDescriptor};
pub use socket::{
    InputSocket, OutputSocket, Socket, SocketBase, SocketId, SocketOwner, SocketType, WeakSocket,
};

// Signals
pub use signal::{
    signal_handler, Signal, SignalDirection, SignalError, SignalHandler, SignalReceiver,
    SignalResult,
};

// Taps
pub use tap::{
    DefaultTap, QueuedTap, SocketTap, TapAction, TimingRegulationConfig, TimingRegulationTap,
    TokenBucketTap,
};
pub use token_bucket::{ByteLength, TokenBucketConfig, TokenBucketPacketQueue};

pub use options::Configurable;
pub use stats::SocketStats;
