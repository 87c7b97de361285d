//! Dashboard summary of the local event log.
//!
//! Read-only; the summary never writes to the log it describes.

use crate::error::TelemetryResult;
use crate::event::{EventType, Metric, StructuredEvent};
use crate::log::read_events;
use crate::trace::EXECUTION_LATENCY;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Aggregate view of a log file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub total_events: usize,
    /// Number of `search_executed` events.
    pub total_executions: usize,
    /// Share of outcome events whose type names an error; 0 when there are
    /// none. `trace_opened` and `metric_recorded` lines are not outcomes.
    pub error_rate: f64,
    /// Mean `execution_latency` in seconds over closed root traces.
    pub avg_latency: Option<f64>,
    /// Events per hour, keyed `YYYY-MM-DDTHH:00`.
    pub hourly: BTreeMap<String, usize>,
    /// The most recent events, oldest first.
    pub recent: Vec<StructuredEvent>,
    pub skipped_lines: usize,
}

impl LogSummary {
    pub const RECENT_LIMIT: usize = 10;

    /// Summarize the log at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> TelemetryResult<Self> {
        let read = read_events(path)?;
        Ok(Self::from_events(&read.events, read.skipped_lines))
    }

    pub fn from_events(events: &[StructuredEvent], skipped_lines: usize) -> Self {
        let total_events = events.len();
        let total_executions = events
            .iter()
            .filter(|e| e.event_type == EventType::SearchExecuted)
            .count();
        let outcomes: Vec<_> = events.iter().filter(|e| is_outcome(e)).collect();
        let errors = outcomes.iter().filter(|e| e.event_type.is_error()).count();

        let latencies: Vec<f64> = events
            .iter()
            .filter_map(Metric::from_event)
            .filter(|m| m.name == EXECUTION_LATENCY)
            .map(|m| m.value)
            .collect();
        let avg_latency = (!latencies.is_empty())
            .then(|| latencies.iter().sum::<f64>() / latencies.len() as f64);

        let mut hourly = BTreeMap::new();
        for event in events {
            let bucket = event.timestamp.format("%Y-%m-%dT%H:00").to_string();
            *hourly.entry(bucket).or_insert(0) += 1;
        }

        let recent = events[total_events.saturating_sub(Self::RECENT_LIMIT)..].to_vec();

        Self {
            total_events,
            total_executions,
            error_rate: errors as f64 / outcomes.len().max(1) as f64,
            avg_latency,
            hourly,
            recent,
            skipped_lines,
        }
    }
}

fn is_outcome(event: &StructuredEvent) -> bool {
    !matches!(
        event.event_type,
        EventType::TraceOpened | EventType::MetricRecorded
    )
}
