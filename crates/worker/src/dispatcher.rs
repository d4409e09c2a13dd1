// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Name-keyed task dispatch on the worker side.

use crate::error::WorkerError;
use crate::task::{WorkerContext, WorkerTask};
use packetflow_core::Packet;
use std::collections::HashMap;
use std::sync::Arc;

/// Runs one task and returns the packets to post back.
pub type TaskHandler =
    Arc<dyn Fn(&WorkerContext, Packet) -> Result<Vec<Packet>, WorkerError> + Send + Sync>;

/// The set of task names a worker understands.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    handlers: HashMap<String, TaskHandler>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the handler for `name`.
    pub fn register<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&WorkerContext, Packet) -> Result<Vec<Packet>, WorkerError> + Send + Sync + 'static,
    {
        if self.handlers.insert(name.to_string(), Arc::new(handler)).is_some() {
            tracing::debug!(task = name, "replaced worker task handler");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    fn handler(&self, name: &str) -> Option<&TaskHandler> {
        self.handlers.get(name)
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry").field("names", &self.names()).finish()
    }
}

/// Per-worker dispatcher, created once when the worker starts.
#[derive(Debug)]
pub struct TaskDispatcher {
    context: WorkerContext,
    registry: TaskRegistry,
    jobs: u64,
}

impl TaskDispatcher {
    pub const fn new(context: WorkerContext, registry: TaskRegistry) -> Self {
        Self { context, registry, jobs: 0 }
    }

    pub const fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// Tasks dispatched so far, failed ones included.
    pub const fn jobs(&self) -> u64 {
        self.jobs
    }

    /// Runs `task` and returns its job number together with the handler's outcome.
    ///
    /// An unknown task name yields [`WorkerError::UnknownTask`] without touching
    /// any handler.
    pub fn dispatch(&mut self, task: WorkerTask) -> (u64, Result<Vec<Packet>, WorkerError>) {
        self.jobs += 1;
        let job = self.jobs;
        let (context, name, packet) = task.into_parts();

        if context != self.context {
            tracing::warn!(
                worker = %self.context,
                addressed_to = %context,
                job,
                "task addressed to another worker context"
            );
        }

        let Some(handler) = self.registry.handler(&name) else {
            return (job, Err(WorkerError::UnknownTask(name)));
        };

        tracing::trace!(worker = %self.context, task = %name, job, "dispatching task");
        (job, handler(&self.context, packet))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::task::task_names;

    fn echo_registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry.register(task_names::DEMUX, |_, packet| Ok(vec![packet]));
        registry
    }

    #[test]
    fn test_dispatch_routes_by_name_and_counts_jobs() {
        let context = WorkerContext::new(7, "demuxer");
        let mut dispatcher = TaskDispatcher::new(context.clone(), echo_registry());

        let task = WorkerTask::new(context.clone(), task_names::DEMUX, Packet::eos());
        let (job, result) = dispatcher.dispatch(task);
        assert_eq!(job, 1);
        assert!(result.unwrap()[0].is_eos());

        let unknown = WorkerTask::new(context, "transcode", Packet::eos());
        let (job, result) = dispatcher.dispatch(unknown);
        assert_eq!(job, 2);
        assert!(matches!(result, Err(WorkerError::UnknownTask(name)) if name == "transcode"));
        assert_eq!(dispatcher.jobs(), 2);
    }

    #[test]
    fn test_job_counters_are_per_dispatcher() {
        let mut a = TaskDispatcher::new(WorkerContext::new(1, "a"), echo_registry());
        let b = TaskDispatcher::new(WorkerContext::new(2, "b"), echo_registry());
        let task = WorkerTask::new(a.context().clone(), task_names::DEMUX, Packet::flush());
        let _ = a.dispatch(task);
        assert_eq!(a.jobs(), 1);
        assert_eq!(b.jobs(), 0);
    }

    #[test]
    fn test_registry_names() {
        let mut registry = echo_registry();
        registry.register("mux", |_, _| Ok(Vec::new()));
        assert!(registry.contains("mux"));
        assert_eq!(registry.names(), vec!["demux".to_string(), "mux".to_string()]);
    }
}
