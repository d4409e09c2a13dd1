// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for packetflow.
//!
//! Packet-path outcomes are reported as booleans (accepted / not accepted) and
//! never surface here. The variants below cover programmer errors: invalid
//! configuration, bad buffer arithmetic and failed signal receivers.

use crate::signal::SignalError;
use thiserror::Error;

/// Main error type for packetflow operations.
#[derive(Debug, Error)]
pub enum PacketFlowError {
    /// Configuration or parameter validation error.
    ///
    /// Examples:
    /// - Drop probability outside `[0, 1]`
    /// - Fractional token rate when scheduling the refill timer
    /// - Non-positive playback speed
    /// - Option patch that is not a JSON object
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Runtime error during normal operation.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Buffer slice arithmetic out of range.
    #[error("Buffer error: {0}")]
    Buffer(String),

    /// A signal receiver settled with a failure.
    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Convenience type alias for Results using `PacketFlowError`.
pub type Result<T> = std::result::Result<T, PacketFlowError>;

impl From<PacketFlowError> for String {
    fn from(err: PacketFlowError) -> Self {
        err.to_string()
    }
}

// Plain strings default to runtime errors
impl From<String> for PacketFlowError {
    fn from(s: String) -> Self {
        Self::Runtime(s)
    }
}

impl From<&str> for PacketFlowError {
    fn from(s: &str) -> Self {
        Self::Runtime(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PacketFlowError::Configuration("drop probability out of range".to_string());
        assert_eq!(err.to_string(), "Configuration error: drop probability out of range");

        let err = PacketFlowError::Buffer("slice end 12 exceeds buffer length 8".to_string());
        assert_eq!(err.to_string(), "Buffer error: slice end 12 exceeds buffer length 8");
    }

    #[test]
    fn test_string_conversions() {
        let err: PacketFlowError = "tap detached".into();
        assert_eq!(err.to_string(), "Runtime error: tap detached");

        let s: String = PacketFlowError::Runtime("boom".to_string()).into();
        assert_eq!(s, "Runtime error: boom");
    }

    #[test]
    fn test_signal_error_is_transparent() {
        let err: PacketFlowError = SignalError::ReceiverFailed("owner offline".to_string()).into();
        assert_eq!(err.to_string(), "signal receiver failed: owner offline");
    }
}
