// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use log_shipper::{
    batcher::Budgets,
    collector::CollectorExit,
    pipeline::Pipeline,
    shutdown::WorkerStatus,
    sink::{
        http::{HttpSink, HttpSinkConfig},
        Sink,
    },
    workload::CommandWorkload,
};
use mockito::{Matcher, Server};

fn sink_config(endpoint: String) -> HttpSinkConfig {
    HttpSinkConfig {
        endpoint,
        log_group: "test-task-group-1".to_string(),
        log_stream: "test-task-stream-1".to_string(),
        api_key: Some("mock-api-key".to_string()),
        timeout: Duration::from_secs(5),
        https_proxy: None,
        use_compression: false,
        compression_level: 6,
    }
}

#[tokio::test]
async fn workload_output_is_shipped_after_provisioning() {
    let mut server = Server::new_async().await;

    let provision = server
        .mock("PUT", "/v1/groups/test-task-group-1/streams/test-task-stream-1")
        .match_header("X-Api-Key", "mock-api-key")
        .with_status(201)
        .create_async()
        .await;
    let events = server
        .mock(
            "POST",
            "/v1/groups/test-task-group-1/streams/test-task-stream-1/events",
        )
        .match_header("X-Api-Key", "mock-api-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "log_group": "test-task-group-1",
            "log_stream": "test-task-stream-1",
        })))
        .with_status(200)
        .expect_at_least(1)
        .create_async()
        .await;

    let sink = Arc::new(HttpSink::new(sink_config(server.url())).expect("failed to build sink"));
    sink.provision().await.expect("failed to provision");
    provision.assert_async().await;

    let mut workload =
        CommandWorkload::spawn("echo 0; echo 1 >&2; echo 2").expect("failed to spawn workload");
    let output = workload.take_output().expect("output not piped");

    let pipeline = Pipeline::new(
        Budgets {
            max_batch_count: 10,
            max_batch_bytes: 1_000,
            flush_interval: Duration::from_secs(10),
        },
        sink,
        Duration::from_secs(5),
    );
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.run(output, std::future::pending::<&'static str>()),
    )
    .await
    .expect("pipeline did not stop after the workload exited");
    workload.stop(Duration::from_secs(1)).await;

    assert!(report.alive_workers().is_empty());
    match report.collector {
        WorkerStatus::Exited(summary) => {
            assert_eq!(summary.exit, CollectorExit::EndOfStream);
            assert_eq!(summary.bytes, 6);
        }
        other => panic!("unexpected collector status {other:?}"),
    }
    match report.batcher {
        WorkerStatus::Exited(summary) => {
            assert_eq!(summary.failed_flushes, 0);
            assert!(summary.events_sent >= 1);
            assert_eq!(summary.bytes_sent, 6 + 26 * summary.events_sent);
        }
        other => panic!("unexpected batcher status {other:?}"),
    }
    events.assert_async().await;
}

#[tokio::test]
async fn rejected_batches_are_dropped_not_retried() {
    let mut server = Server::new_async().await;
    let events = server
        .mock(
            "POST",
            "/v1/groups/test-task-group-1/streams/test-task-stream-1/events",
        )
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let sink = Arc::new(HttpSink::new(sink_config(server.url())).expect("failed to build sink"));
    let pipeline = Pipeline::new(
        Budgets {
            max_batch_count: 10,
            max_batch_bytes: 1_000,
            flush_interval: Duration::from_secs(10),
        },
        sink,
        Duration::from_secs(5),
    );
    let output: &'static [u8] = b"one line\n";

    let report = pipeline
        .run(output, std::future::pending::<&'static str>())
        .await;

    match report.batcher {
        WorkerStatus::Exited(summary) => {
            assert_eq!(summary.flushes, 1);
            assert_eq!(summary.failed_flushes, 1);
            assert_eq!(summary.events_dropped, 1);
        }
        other => panic!("unexpected batcher status {other:?}"),
    }
    events.assert_async().await;
}
