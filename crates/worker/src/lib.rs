// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packetflow Worker - offloads heavy pipeline stages to dedicated threads.
//!
//! A processor hands a [`Packet`](packetflow_core::Packet) to a [`Worker`] inside a
//! [`WorkerTask`] envelope. The packet's byte storage moves with it, without copying.
//! On the worker thread a [`TaskDispatcher`] looks the task name up in the
//! [`TaskRegistry`] and posts the produced packets back as [`WorkerMessage`]s.
//!
//! An unknown task name aborts that task with [`WorkerError::UnknownTask`]; the
//! worker itself keeps running.

pub mod dispatcher;
pub mod error;
pub mod task;
pub mod worker;

pub use dispatcher::{TaskDispatcher, TaskHandler, TaskRegistry};
pub use error::WorkerError;
pub use task::{task_names, TransferList, WorkerContext, WorkerMessage, WorkerTask};
pub use worker::{Worker, WorkerConfig};
