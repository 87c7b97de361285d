//! HTTP exporter and sink behavior against a mocked ingestion endpoint.

use serde_json::{Value, json};
use sonar_core::TraceId;
use sonar_observability::{
    EventData, EventType, HttpExporter, RemoteConfig, RemoteExportError, RemoteExporter,
    TelemetryConfig, TelemetrySink, read_events,
};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INGESTION: &str = "/api/public/ingestion";

fn exporter(server: &MockServer) -> HttpExporter {
    // "pk:sk" in basic auth
    let config = RemoteConfig::new("pk", "sk", server.uri());
    HttpExporter::new(&config, Duration::from_secs(2)).unwrap()
}

fn accepted() -> ResponseTemplate {
    ResponseTemplate::new(207).set_body_json(json!({
        "successes": [{"id": "1", "status": 201}],
        "errors": []
    }))
}

#[tokio::test]
async fn create_trace_posts_trace_create_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INGESTION))
        .and(header("authorization", "Basic cGs6c2s="))
        .and(body_partial_json(json!({
            "batch": [{"type": "trace-create", "body": {"name": "research_agent_execution"}}]
        })))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;

    let trace_id = TraceId::generate();
    let remote_id = exporter(&server)
        .create_trace(
            trace_id,
            "research_agent_execution",
            &json!({"topic": "rust"}),
            &EventData::new(),
        )
        .await
        .unwrap();

    assert_eq!(remote_id, trace_id.to_string());
}

#[tokio::test]
async fn record_score_targets_trace() {
    let server = MockServer::start().await;
    let trace_id = TraceId::generate();
    Mock::given(method("POST"))
        .and(path(INGESTION))
        .and(body_partial_json(json!({
            "batch": [{
                "type": "score-create",
                "body": {"traceId": trace_id.to_string(), "name": "token_usage", "value": 42.0}
            }]
        })))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;

    let mut tags = EventData::new();
    tags.insert("agent".into(), json!("research_agent"));
    exporter(&server)
        .record_score(trace_id, "token_usage", 42.0, &tags)
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_credentials_are_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INGESTION))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let result = exporter(&server)
        .record_trace("search_executed", &Value::Null, &Value::Null, &EventData::new())
        .await;

    match result {
        Err(RemoteExportError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid credentials");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn partial_failure_in_batch_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INGESTION))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!({
            "successes": [],
            "errors": [{"id": "1", "status": 400, "message": "invalid body"}]
        })))
        .mount(&server)
        .await;

    let result = exporter(&server)
        .record_trace("agent_error", &Value::Null, &Value::Null, &EventData::new())
        .await;

    assert!(matches!(
        result,
        Err(RemoteExportError::Status { status: 400, .. })
    ));
}

#[tokio::test]
async fn slow_collector_does_not_stall_local_log() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INGESTION))
        .respond_with(accepted().set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = TelemetryConfig {
        log_path: dir.path().join("agent_logs.json"),
        remote: Some(RemoteConfig::new("pk", "sk", server.uri())),
        remote_timeout: Duration::from_millis(100),
        ..TelemetryConfig::default()
    };
    let sink = TelemetrySink::from_config(&config).unwrap();

    let started = Instant::now();
    let mut data = EventData::new();
    data.insert("query".into(), json!("quantum computing"));
    sink.record_event(EventType::SearchExecuted, data)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    let read = read_events(sink.log_path()).unwrap();
    assert_eq!(read.events.len(), 1);
    assert_eq!(read.events[0].data["query"], "quantum computing");
}

#[tokio::test]
async fn unreachable_collector_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let config = TelemetryConfig {
        log_path: dir.path().join("agent_logs.json"),
        // Nothing listens on the discard port.
        remote: Some(RemoteConfig::new("pk", "sk", "http://127.0.0.1:9")),
        remote_timeout: Duration::from_millis(500),
        ..TelemetryConfig::default()
    };
    let sink = TelemetrySink::from_config(&config).unwrap();

    let trace = sink
        .open_trace("research_agent_execution", Value::Null, EventData::new())
        .await
        .unwrap();
    assert!(trace.remote_id().is_none());

    let trace_id = trace.id();
    trace
        .fail(EventType::AgentError, EventData::new(), "offline")
        .await
        .unwrap();
    sink.record_metric(trace_id, "token_usage", 0.0, EventData::new())
        .await
        .unwrap();

    let read = read_events(sink.log_path()).unwrap();
    assert_eq!(read.events.len(), 4);
    assert_eq!(read.skipped_lines, 0);
}
