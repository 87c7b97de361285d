//! Trace lifecycle
//!
//! A [`TraceContext`] is one unit of work: an agent run or a single tool
//! call. It is opened through the sink and closed exactly once, either with
//! [`TraceContext::succeed`] or [`TraceContext::fail`]; both consume the
//! context. Closing writes one event. A context that goes out of scope
//! without being closed (early return, panic unwinding) writes a
//! `trace_abandoned` line from its `Drop` impl.
//!
//! Children are opened with [`TraceContext::child`] and should be closed
//! before their parent. That ordering is not checked.

use crate::error::TelemetryResult;
use crate::event::{EventData, EventType, StructuredEvent};
use crate::sink::{TelemetrySink, parent_value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sonar_core::TraceId;
use std::time::{Duration, Instant};

/// Metric recorded for every closed root trace.
pub const EXECUTION_LATENCY: &str = "execution_latency";

/// How a trace ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Success,
    Failure,
    Abandoned,
}

impl TraceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStatus::Success => "success",
            TraceStatus::Failure => "failure",
            TraceStatus::Abandoned => "abandoned",
        }
    }
}

/// Summary handed back once a trace is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrace {
    pub id: TraceId,
    pub name: String,
    pub parent_id: Option<TraceId>,
    pub duration: Duration,
    pub status: TraceStatus,
}

/// An open unit of work.
///
/// Not `Clone`: exactly one owner decides how the trace ends.
pub struct TraceContext {
    sink: TelemetrySink,
    id: TraceId,
    name: String,
    input: Value,
    metadata: EventData,
    parent_id: Option<TraceId>,
    remote_id: Option<String>,
    started_at: DateTime<Utc>,
    started: Instant,
    closed: bool,
}

impl std::fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent_id", &self.parent_id)
            .field("remote_id", &self.remote_id)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl TraceContext {
    pub(crate) fn new(
        sink: TelemetrySink,
        id: TraceId,
        name: String,
        input: Value,
        metadata: EventData,
        parent_id: Option<TraceId>,
        remote_id: Option<String>,
        started_at: DateTime<Utc>,
        started: Instant,
    ) -> Self {
        Self {
            sink,
            id,
            name,
            input,
            metadata,
            parent_id,
            remote_id,
            started_at,
            started,
            closed: false,
        }
    }

    pub(crate) fn set_remote_id(&mut self, remote_id: Option<String>) {
        self.remote_id = remote_id;
    }

    pub fn id(&self) -> TraceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn metadata(&self) -> &EventData {
        &self.metadata
    }

    pub fn parent_id(&self) -> Option<TraceId> {
        self.parent_id
    }

    /// Id assigned by the remote collector, when export succeeded.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Time since the trace was opened.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Open a nested trace under this one.
    pub async fn child(
        &self,
        name: &str,
        input: Value,
        metadata: EventData,
    ) -> TelemetryResult<TraceContext> {
        self.sink
            .open_with_parent(name, input, metadata, Some(self.id))
            .await
    }

    /// Close the trace as successful.
    ///
    /// Records one `event_type` event with `data` plus the trace identity,
    /// `duration` and `output`.
    pub async fn succeed(
        self,
        event_type: EventType,
        data: EventData,
        output: impl Into<Value>,
    ) -> TelemetryResult<ClosedTrace> {
        self.close(TraceStatus::Success, event_type, data, "output", output.into())
            .await
    }

    /// Close the trace as failed.
    ///
    /// Records one `event_type` event with `data` plus the trace identity,
    /// `duration` and `error`.
    pub async fn fail(
        self,
        event_type: EventType,
        data: EventData,
        error: impl std::fmt::Display,
    ) -> TelemetryResult<ClosedTrace> {
        let error = Value::String(error.to_string());
        self.close(TraceStatus::Failure, event_type, data, "error", error)
            .await
    }

    async fn close(
        mut self,
        status: TraceStatus,
        event_type: EventType,
        mut data: EventData,
        outcome_key: &str,
        outcome: Value,
    ) -> TelemetryResult<ClosedTrace> {
        // Any exit past this point counts as the one closure.
        self.closed = true;
        let duration = self.started.elapsed();

        let augment = [
            ("trace_id", Value::String(self.id.to_string())),
            ("trace_name", Value::String(self.name.clone())),
            ("parent_id", parent_value(self.parent_id)),
            ("duration", Value::from(duration.as_secs_f64())),
            (outcome_key, outcome),
        ];
        for (key, value) in augment {
            data.entry(key).or_insert(value);
        }

        self.sink.record_event(event_type.clone(), data).await?;
        self.sink
            .observe_closed(status, &self.name, self.is_root(), duration);

        tracing::debug!(
            trace_id = %self.id,
            trace_name = %self.name,
            status = status.as_str(),
            event_type = %event_type,
            duration_ms = duration.as_millis() as u64,
            "Closed trace"
        );

        if self.is_root() {
            let mut tags = EventData::new();
            tags.insert("agent".into(), self.agent_tag());
            tags.insert("status".into(), Value::String(status.as_str().to_string()));
            self.sink
                .record_metric(self.id, EXECUTION_LATENCY, duration.as_secs_f64(), tags)
                .await?;
        }

        Ok(ClosedTrace {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
            duration,
            status,
        })
    }

    fn agent_tag(&self) -> Value {
        self.metadata
            .get("agent_type")
            .cloned()
            .unwrap_or_else(|| Value::String(self.name.clone()))
    }
}

impl Drop for TraceContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let duration = self.started.elapsed();
        let mut data = EventData::new();
        data.insert("trace_id".into(), Value::String(self.id.to_string()));
        data.insert("trace_name".into(), Value::String(self.name.clone()));
        data.insert("parent_id".into(), parent_value(self.parent_id));
        data.insert("duration".into(), Value::from(duration.as_secs_f64()));

        let event = StructuredEvent::new(EventType::TraceAbandoned, data);
        match self.sink.append_local(&event) {
            Ok(()) => tracing::warn!(
                trace_id = %self.id,
                trace_name = %self.name,
                "Trace dropped without being closed"
            ),
            Err(error) => tracing::error!(
                trace_id = %self.id,
                trace_name = %self.name,
                error = %error,
                "Failed to record abandoned trace"
            ),
        }
        self.sink
            .observe_closed(TraceStatus::Abandoned, &self.name, self.is_root(), duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::read_events;
    use serde_json::json;

    fn sink(dir: &tempfile::TempDir) -> TelemetrySink {
        TelemetrySink::builder(dir.path().join("agent_logs.json"))
            .build()
            .unwrap()
    }

    fn agent_metadata() -> EventData {
        let mut metadata = EventData::new();
        metadata.insert("agent_type".into(), json!("research_agent"));
        metadata
    }

    #[tokio::test]
    async fn succeed_records_event_and_latency() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);

        let trace = sink
            .open_trace("research_agent_execution", json!({"topic": "rust"}), agent_metadata())
            .await
            .unwrap();
        let id = trace.id();

        let mut data = EventData::new();
        data.insert("topic".into(), json!("rust"));
        let closed = trace
            .succeed(EventType::AgentCompleted, data, "answer")
            .await
            .unwrap();

        assert_eq!(closed.id, id);
        assert_eq!(closed.status, TraceStatus::Success);

        let events = read_events(sink.log_path()).unwrap().events;
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["trace_opened", "agent_completed", "metric_recorded"]);

        let completed = &events[1];
        assert_eq!(completed.data["topic"], "rust");
        assert_eq!(completed.data["output"], "answer");
        assert_eq!(completed.trace_id(), Some(id));
        assert!(completed.data["duration"].as_f64().unwrap() >= 0.0);

        let latency = &events[2];
        assert_eq!(latency.data["name"], EXECUTION_LATENCY);
        assert_eq!(latency.data["tags"]["agent"], "research_agent");
        assert_eq!(latency.data["tags"]["status"], "success");
        assert_eq!(latency.trace_id(), Some(id));
    }

    #[tokio::test]
    async fn children_record_no_latency_metric() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);

        let run = sink
            .open_trace("run", Value::Null, agent_metadata())
            .await
            .unwrap();
        let child = run
            .child("web_search", json!({"query": "rust"}), EventData::new())
            .await
            .unwrap();
        assert_eq!(child.parent_id(), Some(run.id()));
        assert!(!child.is_root());

        let closed = child
            .fail(EventType::SearchError, EventData::new(), "offline")
            .await
            .unwrap();
        assert_eq!(closed.parent_id, Some(run.id()));
        assert_eq!(closed.status, TraceStatus::Failure);

        run.succeed(EventType::AgentCompleted, EventData::new(), "")
            .await
            .unwrap();

        let events = read_events(sink.log_path()).unwrap().events;
        let errors: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EventType::SearchError)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].data["error"], "offline");
        assert_eq!(errors[0].data["trace_name"], "web_search");

        let latencies = events
            .iter()
            .filter(|e| e.event_type == EventType::MetricRecorded)
            .count();
        assert_eq!(latencies, 1);
    }

    #[tokio::test]
    async fn caller_keys_win_over_augmentation() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);

        let trace = sink
            .open_trace("run", Value::Null, EventData::new())
            .await
            .unwrap();
        let mut data = EventData::new();
        data.insert("error".into(), json!("caller message"));
        trace
            .fail(EventType::AgentError, data, "generated message")
            .await
            .unwrap();

        let events = read_events(sink.log_path()).unwrap().events;
        assert_eq!(events[1].data["error"], "caller message");
    }

    #[tokio::test]
    async fn dropped_trace_is_recorded_as_abandoned() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);

        let trace = sink
            .open_trace("run", Value::Null, EventData::new())
            .await
            .unwrap();
        let id = trace.id();
        drop(trace);

        let events = read_events(sink.log_path()).unwrap().events;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::TraceAbandoned);
        assert_eq!(events[1].trace_id(), Some(id));
    }

    #[tokio::test]
    async fn closed_trace_is_not_abandoned() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);

        let trace = sink
            .open_trace("run", Value::Null, EventData::new())
            .await
            .unwrap();
        trace
            .succeed(EventType::AgentCompleted, EventData::new(), "")
            .await
            .unwrap();

        let events = read_events(sink.log_path()).unwrap().events;
        assert!(
            events
                .iter()
                .all(|e| e.event_type != EventType::TraceAbandoned)
        );
    }
}
