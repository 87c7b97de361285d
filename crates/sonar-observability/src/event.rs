//! Structured events and metrics
//!
//! The two record types written to the local log. Both are immutable once
//! built; the sink stamps the timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sonar_core::TraceId;
use std::fmt;

/// Free-form payload of an event, metadata map or metric tag set.
pub type EventData = serde_json::Map<String, Value>;

/// Kind of a structured event.
///
/// Serialized as its plain snake_case name (`"search_executed"`), so log
/// readers and dashboards can match on strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    SearchExecuted,
    SearchError,
    AgentError,
    AgentCompleted,
    TraceOpened,
    MetricRecorded,
    TraceAbandoned,
    /// Any other event name, e.g. `summarize_executed` or `tool_error`.
    Custom(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::SearchExecuted => "search_executed",
            EventType::SearchError => "search_error",
            EventType::AgentError => "agent_error",
            EventType::AgentCompleted => "agent_completed",
            EventType::TraceOpened => "trace_opened",
            EventType::MetricRecorded => "metric_recorded",
            EventType::TraceAbandoned => "trace_abandoned",
            EventType::Custom(name) => name,
        }
    }

    /// Map a name back onto a known variant, falling back to `Custom`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "search_executed" => EventType::SearchExecuted,
            "search_error" => EventType::SearchError,
            "agent_error" => EventType::AgentError,
            "agent_completed" => EventType::AgentCompleted,
            "trace_opened" => EventType::TraceOpened,
            "metric_recorded" => EventType::MetricRecorded,
            "trace_abandoned" => EventType::TraceAbandoned,
            other => EventType::Custom(other.to_string()),
        }
    }

    /// `{prefix}_executed`
    pub fn tool_executed(prefix: &str) -> Self {
        Self::from_name(&format!("{prefix}_executed"))
    }

    /// `{prefix}_error`
    pub fn tool_error(prefix: &str) -> Self {
        Self::from_name(&format!("{prefix}_error"))
    }

    /// Whether the event reports a failure (its name contains `error`).
    pub fn is_error(&self) -> bool {
        self.as_str().contains("error")
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EventType::from_name(&name))
    }
}

/// One line of the local log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(default)]
    pub data: EventData,
}

impl StructuredEvent {
    pub fn new(event_type: EventType, data: EventData) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            data,
        }
    }

    /// Look up a field of `data`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Trace this event belongs to, if it carries one.
    pub fn trace_id(&self) -> Option<TraceId> {
        self.get("trace_id")
            .and_then(Value::as_str)
            .and_then(|id| TraceId::parse(id).ok())
    }
}

/// A named numeric measurement attached to a trace.
///
/// `trace_id` is a plain back reference; holding it grants nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub trace_id: TraceId,
    pub name: String,
    pub value: f64,
    pub tags: EventData,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(trace_id: TraceId, name: impl Into<String>, value: f64, tags: EventData) -> Self {
        Self {
            trace_id,
            name: name.into(),
            value,
            tags,
            timestamp: Utc::now(),
        }
    }

    /// Payload of the `metric_recorded` line mirroring this metric.
    pub fn to_event_data(&self) -> EventData {
        let mut data = EventData::new();
        data.insert("trace_id".into(), Value::String(self.trace_id.to_string()));
        data.insert("name".into(), Value::String(self.name.clone()));
        data.insert("value".into(), Value::from(self.value));
        data.insert("tags".into(), Value::Object(self.tags.clone()));
        data
    }

    /// Rebuild a metric from a `metric_recorded` event.
    pub fn from_event(event: &StructuredEvent) -> Option<Self> {
        if event.event_type != EventType::MetricRecorded {
            return None;
        }
        Some(Self {
            trace_id: event.trace_id()?,
            name: event.get("name")?.as_str()?.to_string(),
            value: event.get("value")?.as_f64()?,
            tags: event
                .get("tags")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            timestamp: event.timestamp,
        })
    }
}
