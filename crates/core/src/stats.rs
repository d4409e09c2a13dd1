// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Per-socket transfer statistics.
//!
//! Counters are updated on the packet path with relaxed atomics and read as a
//! [`SocketStats`] snapshot.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a socket's transfer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketStats {
    /// Packets the socket delivered downstream and saw accepted
    pub accepted: u64,
    /// Packets refused (closed socket, receiver returned `false`, no peers)
    pub rejected: u64,
    /// Packets taken over by an installed tap
    pub held_by_tap: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SocketStatsTracker {
    accepted: AtomicU64,
    rejected: AtomicU64,
    held_by_tap: AtomicU64,
}

impl SocketStatsTracker {
    #[inline]
    pub(crate) fn record(&self, accepted: bool) {
        if accepted {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn held(&self) {
        self.held_by_tap.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SocketStats {
        SocketStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            held_by_tap: self.held_by_tap.load(Ordering::Relaxed),
        }
    }
}
