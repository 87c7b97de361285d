//! Telemetry Sink Performance Benchmarks
//!
//! Measures the cost of the local write path (event append, metric record,
//! trace open and close) and of a full instrumented run against mock tools.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use sonar::{EventData, EventType, TelemetrySink};
use sonar_testing::{AgentHarness, ScriptedBackend};
use std::time::Duration;
use tokio::runtime::Runtime;

fn payload(size: usize) -> EventData {
    let mut data = EventData::new();
    data.insert("query".into(), Value::String("x".repeat(size)));
    data
}

/// Benchmark appending events of different payload sizes
fn bench_record_event(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let sink = TelemetrySink::builder(dir.path().join("agent_logs.json"))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("record_event");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    for size in [16usize, 1024, 16 * 1024] {
        group.bench_with_input(BenchmarkId::new("payload", size), &size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                std::hint::black_box(
                    sink.record_event(EventType::SearchExecuted, payload(size))
                        .await
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

/// Benchmark a full trace lifecycle: open, one metric, close
fn bench_trace_lifecycle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let sink = TelemetrySink::builder(dir.path().join("agent_logs.json"))
        .build()
        .unwrap();

    c.bench_function("trace_lifecycle", |b| {
        b.to_async(&rt).iter(|| async {
            let trace = sink
                .open_trace("bench", json!({"topic": "rust"}), EventData::new())
                .await
                .unwrap();
            sink.record_metric(trace.id(), "token_usage", 64.0, EventData::new())
                .await
                .unwrap();
            trace
                .succeed(EventType::AgentCompleted, EventData::new(), "done")
                .await
                .unwrap()
        })
    });
}

/// Benchmark an instrumented agent run with one tool call
fn bench_agent_run(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("agent_run_single_tool", |b| {
        b.to_async(&rt).iter(|| async {
            let harness = AgentHarness::builder()
                .backend(ScriptedBackend::single_tool("web_search", "rust"))
                .build()
                .unwrap();
            std::hint::black_box(harness.agent().run("rust").await.unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_record_event,
    bench_trace_lifecycle,
    bench_agent_run
);
criterion_main!(benches);
