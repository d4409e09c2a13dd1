// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The worker handle: a named OS thread fed through bounded channels.

use crate::dispatcher::{TaskDispatcher, TaskRegistry};
use crate::error::WorkerError;
use crate::task::{WorkerContext, WorkerMessage, WorkerTask};
use packetflow_core::{Packet, PacketFlowError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Configuration for a [`Worker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WorkerConfig {
    /// OS thread name, also used as the worker context name.
    pub thread_name: String,
    /// Capacity of the task queue towards the worker.
    pub task_capacity: usize,
    /// Capacity of the result queue back from the worker.
    pub result_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: "packetflow-worker".to_string(),
            task_capacity: 32,
            result_capacity: 32,
        }
    }
}

impl WorkerConfig {
    /// # Errors
    ///
    /// Returns an error if a capacity is zero or the thread name is empty.
    pub fn validate(&self) -> Result<(), PacketFlowError> {
        if self.task_capacity == 0 || self.result_capacity == 0 {
            return Err(PacketFlowError::Configuration(
                "worker queue capacities must be greater than 0".to_string(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(PacketFlowError::Configuration("thread_name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Handle to a worker thread.
///
/// Tasks go out through a bounded queue; results and failures come back as
/// [`WorkerMessage`]s. Dropping the handle lets the thread finish its queue and exit
/// without waiting for it; [`Worker::shutdown`] also joins it.
#[derive(Debug)]
pub struct Worker {
    context: WorkerContext,
    tasks: Option<mpsc::Sender<WorkerTask>>,
    results: mpsc::Receiver<WorkerMessage>,
    thread: Option<JoinHandle<u64>>,
}

impl Worker {
    /// Starts a worker thread serving the tasks in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the thread cannot be spawned.
    pub fn spawn(config: WorkerConfig, registry: TaskRegistry) -> Result<Self, WorkerError> {
        static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

        config.validate()?;
        let context = WorkerContext::new(
            NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
            config.thread_name.as_str(),
        );
        let (task_tx, task_rx) = mpsc::channel(config.task_capacity);
        let (result_tx, result_rx) = mpsc::channel(config.result_capacity);

        let dispatcher = TaskDispatcher::new(context.clone(), registry);
        let thread = std::thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || run_worker(dispatcher, task_rx, &result_tx))?;

        tracing::debug!(worker = %context, "worker spawned");
        Ok(Self { context, tasks: Some(task_tx), results: result_rx, thread: Some(thread) })
    }

    pub const fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// Builds an envelope addressed to this worker. The packet moves into it.
    pub fn task(&self, name: &str, packet: Packet) -> WorkerTask {
        WorkerTask::new(self.context.clone(), name, packet)
    }

    /// Queues a task, waiting for queue space.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::WorkerClosed`] if the worker has stopped.
    pub async fn send(&self, task: WorkerTask) -> Result<(), WorkerError> {
        let tasks = self.tasks.as_ref().ok_or(WorkerError::WorkerClosed)?;
        tasks.send(task).await.map_err(|_| WorkerError::WorkerClosed)
    }

    /// Queues a task without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::QueueFull`] when the queue is at capacity, or
    /// [`WorkerError::WorkerClosed`] if the worker has stopped.
    pub fn try_send(&self, task: WorkerTask) -> Result<(), WorkerError> {
        let tasks = self.tasks.as_ref().ok_or(WorkerError::WorkerClosed)?;
        tasks.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => WorkerError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => WorkerError::WorkerClosed,
        })
    }

    /// Next message from the worker. `None` once the worker has exited and every
    /// message was received.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.results.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        self.results.try_recv().ok()
    }

    /// Stops accepting tasks, waits for the queued ones and joins the thread.
    ///
    /// Returns the number of tasks the worker dispatched. Results not yet received
    /// are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Panicked`] if the worker thread panicked.
    pub fn shutdown(mut self) -> Result<u64, WorkerError> {
        self.tasks = None;
        self.results.close();
        let jobs = match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| WorkerError::Panicked)?,
            None => 0,
        };
        tracing::debug!(worker = %self.context, jobs, "worker shut down");
        Ok(jobs)
    }
}

fn run_worker(
    mut dispatcher: TaskDispatcher,
    mut tasks: mpsc::Receiver<WorkerTask>,
    results: &mpsc::Sender<WorkerMessage>,
) -> u64 {
    let context = dispatcher.context().clone();
    tracing::debug!(worker = %context, "worker thread started");

    while let Some(task) = tasks.blocking_recv() {
        let name = task.name().to_string();
        let (job, outcome) = dispatcher.dispatch(task);

        let delivered = match outcome {
            Ok(packets) => packets.into_iter().all(|packet| {
                results
                    .blocking_send(WorkerMessage::Result { context: context.clone(), job, packet })
                    .is_ok()
            }),
            Err(error) => {
                tracing::error!(worker = %context, task = %name, job, %error, "worker task failed");
                let failed = WorkerMessage::Failed { context: context.clone(), job, name, error };
                results.blocking_send(failed).is_ok()
            },
        };

        if !delivered {
            tracing::debug!(worker = %context, "result receiver dropped, stopping worker");
            break;
        }
    }

    tracing::debug!(worker = %context, jobs = dispatcher.jobs(), "worker thread exiting");
    dispatcher.jobs()
}
