// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Round trips through a worker thread: dispatch, zero-copy transfer and failures.

use bytes::Bytes;
use packetflow_core::{BufferSlice, Packet};
use packetflow_worker::{
    task_names, TaskRegistry, Worker, WorkerConfig, WorkerError, WorkerMessage,
};
use std::time::Duration;
use tokio::time::timeout;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Splits a packet into one packet per slice, like a demuxer emitting samples.
fn demux_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register(task_names::DEMUX, |_, packet| {
        Ok(packet
            .slices()
            .cloned()
            .enumerate()
            .map(|(i, slice)| Packet::from_slices([slice], packet.dts() + i as i64))
            .collect())
    });
    registry.register("reject", |_, _| Err(WorkerError::task_failed("reject", "corrupt input")));
    registry
}

async fn next(worker: &mut Worker) -> WorkerMessage {
    timeout(Duration::from_secs(5), worker.recv())
        .await
        .expect("worker did not answer in time")
        .expect("worker closed unexpectedly")
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_demux_task_round_trip_moves_buffers() {
    init_tracing();
    let mut worker = Worker::spawn(
        WorkerConfig { thread_name: "demux-worker".to_string(), ..Default::default() },
        demux_registry(),
    )
    .expect("worker spawns");
    assert_eq!(worker.context().name(), "demux-worker");

    let storage = Bytes::from((0u8..32).collect::<Vec<_>>());
    let container = Packet::from_slices(
        [
            BufferSlice::new(storage.clone()).sub_slice(0, 8).expect("in range"),
            BufferSlice::new(storage.clone()).sub_slice(8, 24).expect("in range"),
        ],
        100,
    );
    drop(storage);

    let task = worker.task(task_names::DEMUX, container);
    let transfer = task.transfer_list().clone();
    assert_eq!(transfer.buffers().len(), 1);
    assert_eq!(transfer.byte_length(), 32);
    worker.send(task).await.expect("task queued");

    let mut received = Vec::new();
    for _ in 0..2 {
        match next(&mut worker).await {
            WorkerMessage::Result { job, packet, .. } => {
                assert_eq!(job, 1);
                received.push(packet);
            },
            WorkerMessage::Failed { error, .. } => panic!("unexpected failure: {error}"),
        }
    }

    assert_eq!(received[0].dts(), 100);
    assert_eq!(received[1].dts(), 101);
    assert_eq!(received[0].byte_length(), 8);
    let tail: Vec<u8> = (8u8..32).collect();
    assert_eq!(received[1].slices().next().map(BufferSlice::data), Some(&tail[..]));
    // The results alias the storage that was sent, nothing was copied
    for packet in &received {
        assert!(packet.buffer_ids().iter().all(|id| transfer.contains(id)));
    }

    assert_eq!(worker.shutdown().expect("clean shutdown"), 1);
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_unknown_task_fails_only_that_task() {
    init_tracing();
    let mut worker =
        Worker::spawn(WorkerConfig::default(), demux_registry()).expect("worker spawns");

    worker.send(worker.task("transcode", Packet::eos())).await.expect("task queued");
    let demux = worker.task(task_names::DEMUX, Packet::from_bytes(vec![1u8; 4], 0));
    worker.send(demux).await.expect("task queued");

    match next(&mut worker).await {
        WorkerMessage::Failed { job, name, error, .. } => {
            assert_eq!(job, 1);
            assert_eq!(name, "transcode");
            assert!(matches!(error, WorkerError::UnknownTask(_)));
        },
        WorkerMessage::Result { .. } => panic!("unknown task must not produce results"),
    }

    // The worker keeps serving later tasks
    let message = next(&mut worker).await;
    assert_eq!(message.job(), 2);
    assert_eq!(message.into_packet().map(|p| p.byte_length()), Some(4));

    assert_eq!(worker.shutdown().expect("clean shutdown"), 2);
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_handler_failure_is_reported() {
    let mut worker =
        Worker::spawn(WorkerConfig::default(), demux_registry()).expect("worker spawns");
    worker.send(worker.task("reject", Packet::flush())).await.expect("task queued");

    match next(&mut worker).await {
        WorkerMessage::Failed { error: WorkerError::TaskFailed { message, .. }, .. } => {
            assert_eq!(message, "corrupt input");
        },
        other => panic!("expected a task failure, got {other:?}"),
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = WorkerConfig { task_capacity: 0, ..Default::default() };
    assert!(matches!(Worker::spawn(config, TaskRegistry::new()), Err(WorkerError::Core(_))));
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_shutdown_with_unread_results_does_not_hang() {
    let mut registry = TaskRegistry::new();
    registry.register("fanout", |_, packet| Ok(vec![packet; 8]));
    let worker = Worker::spawn(
        WorkerConfig { result_capacity: 1, ..Default::default() },
        registry,
    )
    .expect("worker spawns");

    worker.try_send(worker.task("fanout", Packet::eos())).expect("task queued");
    let jobs = tokio::task::spawn_blocking(move || worker.shutdown())
        .await
        .expect("join")
        .expect("clean shutdown");
    assert!(jobs <= 1);
}
