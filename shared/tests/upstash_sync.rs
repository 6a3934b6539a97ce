use std::io::Write;
use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use reqwest::StatusCode;
use serde_json::json;
use shared::config::UpstashSettings;
use shared::topics::DesiredTopic;
use shared::upstash::UpstashClient;
use shared::SyncError;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn client(server: &MockServer) -> UpstashClient {
    UpstashClient::new(&UpstashSettings {
        token: "tok".into(),
        cluster_id: "c-1".into(),
        api_base: server.base_url(),
    })
}

#[tokio::test]
async fn nothing_missing_issues_no_post() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/topics/c-1")
                .header("authorization", "Bearer tok");
            then.status(200)
                .json_body(json!([{ "topic_name": "origin.events", "partitions": 2 }]));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/topic");
            then.status(200);
        })
        .await;

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    client(&server)
        .reconcile(&[DesiredTopic::new("events", 2)], "origin")
        .await
        .unwrap();

    list.assert_async().await;
    assert_eq!(create.hits_async().await, 0);
    assert!(logs.contents().contains("No topics to create"));
}

#[tokio::test]
async fn creates_missing_topics_with_fixed_defaults() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/topics/c-1");
            then.status(200).json_body(json!([]));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/topic")
                .header("authorization", "Bearer tok")
                .json_body(json!({
                    "name": "origin.orders",
                    "partitions": 3,
                    "retention_time": 604800000u64,
                    "retention_size": 268435456u64,
                    "max_message_size": 10485760u64,
                    "cleanup_policy": "delete",
                    "cluster_id": "c-1"
                }));
            then.status(200).json_body(json!({ "topic_name": "origin.orders" }));
        })
        .await;

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    client(&server)
        .reconcile(&[DesiredTopic::new("orders", 3)], "origin")
        .await
        .unwrap();

    create.assert_async().await;
    let logs = logs.contents();
    assert!(logs.contains("Creating topics"));
    assert!(logs.contains("topics=orders"));
}

#[tokio::test]
async fn failed_post_aborts_remaining_creations() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/topics/c-1");
            then.status(200).json_body(json!([]));
        })
        .await;
    let first = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/topic")
                .json_body_partial(r#"{ "name": "origin.a" }"#);
            then.status(200);
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/topic")
                .json_body_partial(r#"{ "name": "origin.b" }"#);
            then.status(500);
        })
        .await;
    let third = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/topic")
                .json_body_partial(r#"{ "name": "origin.c" }"#);
            then.status(200);
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE);
            then.status(200);
        })
        .await;

    let desired = [
        DesiredTopic::new("a", 1),
        DesiredTopic::new("b", 1),
        DesiredTopic::new("c", 1),
    ];
    let result = client(&server).reconcile(&desired, "origin").await;

    match result {
        Err(SyncError::Http(err)) => {
            assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR))
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(third.hits_async().await, 0);
    assert_eq!(delete.hits_async().await, 0);
}

#[tokio::test]
async fn listing_failure_propagates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/topics/c-1");
            then.status(401);
        })
        .await;

    let result = client(&server)
        .reconcile(&[DesiredTopic::new("orders", 1)], "origin")
        .await;

    assert!(matches!(
        result,
        Err(SyncError::Http(ref err)) if err.status() == Some(StatusCode::UNAUTHORIZED)
    ));
}
