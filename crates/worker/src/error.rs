// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use packetflow_core::PacketFlowError;
use thiserror::Error;

/// Errors raised by worker dispatch and the worker handle.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The task name has no registered handler. Fatal for that task; never retried.
    #[error("unknown worker task: {0}")]
    UnknownTask(String),

    /// A registered handler reported a failure.
    #[error("worker task '{name}' failed: {message}")]
    TaskFailed { name: String, message: String },

    /// The worker thread is gone or shutting down.
    #[error("worker is closed")]
    WorkerClosed,

    /// The bounded task queue is full.
    #[error("worker task queue is full")]
    QueueFull,

    /// The worker thread panicked.
    #[error("worker thread panicked")]
    Panicked,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] PacketFlowError),
}

impl WorkerError {
    pub fn task_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed { name: name.into(), message: message.into() }
    }
}
