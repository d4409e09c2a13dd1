// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Socket payload descriptors.
//!
//! A [`SocketDescriptor`] is a *shared* list of [`PayloadDescriptor`]s. Cloning the
//! descriptor clones the handle, not the list: every socket built from the same
//! descriptor observes the same payload list, so connected processors can negotiate
//! and update payload types jointly.
//!
//! The list is only meant to be shared inside one execution context. Handing it to a
//! worker thread outside the task envelope is unsupported.

use crate::helpers::lock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Describes one payload type a socket carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PayloadDescriptor {
    /// MIME type, e.g. `video/mp4` or `audio/mpeg`.
    pub mime_type: String,
    /// Codec string (RFC 6381 style), e.g. `avc1.64001f`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl PayloadDescriptor {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self { mime_type: mime_type.into(), ..Default::default() }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }
}

/// Shared, mutable list of payload descriptors.
#[derive(Debug, Clone, Default)]
pub struct SocketDescriptor {
    payloads: Arc<Mutex<Vec<PayloadDescriptor>>>,
}

impl SocketDescriptor {
    pub fn new(payloads: Vec<PayloadDescriptor>) -> Self {
        Self { payloads: Arc::new(Mutex::new(payloads)) }
    }

    /// Snapshot of the current payload list.
    pub fn payloads(&self) -> Vec<PayloadDescriptor> {
        lock(&self.payloads).clone()
    }

    /// Mutates the shared list in place. Visible through every co-owning socket.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<PayloadDescriptor>) -> R) -> R {
        f(&mut lock(&self.payloads))
    }

    pub fn push(&self, payload: PayloadDescriptor) {
        self.update(|payloads| payloads.push(payload));
    }

    pub fn len(&self) -> usize {
        lock(&self.payloads).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.payloads).is_empty()
    }

    /// Whether both handles refer to the same underlying list.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payloads, &other.payloads)
    }
}

impl From<Vec<PayloadDescriptor>> for SocketDescriptor {
    fn from(payloads: Vec<PayloadDescriptor>) -> Self {
        Self::new(payloads)
    }
}
