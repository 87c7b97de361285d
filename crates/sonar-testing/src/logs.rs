//! # Log Inspection
//!
//! Helpers for asserting on the local event log after a run.

use sonar_core::TraceId;
use sonar_observability::{EventType, Metric, StructuredEvent, TelemetryResult, read_events};
use std::collections::BTreeMap;
use std::path::Path;

/// Every well-formed event in the log at `path`.
pub fn events(path: impl AsRef<Path>) -> TelemetryResult<Vec<StructuredEvent>> {
    Ok(read_events(path)?.events)
}

/// Events of one type, in log order.
pub fn events_of_type(
    path: impl AsRef<Path>,
    event_type: &EventType,
) -> TelemetryResult<Vec<StructuredEvent>> {
    Ok(events(path)?
        .into_iter()
        .filter(|e| &e.event_type == event_type)
        .collect())
}

/// Number of events whose type is named `name`.
pub fn count_events(path: impl AsRef<Path>, name: &str) -> TelemetryResult<usize> {
    Ok(events(path)?
        .iter()
        .filter(|e| e.event_type.as_str() == name)
        .count())
}

/// Metrics named `name`, decoded from `metric_recorded` lines.
pub fn metrics_named(path: impl AsRef<Path>, name: &str) -> TelemetryResult<Vec<Metric>> {
    Ok(events(path)?
        .iter()
        .filter_map(Metric::from_event)
        .filter(|m| m.name == name)
        .collect())
}

/// Which traces were opened and how often each was closed.
///
/// A closure is any event carrying both `trace_id` and `trace_name`, which
/// covers `succeed`, `fail` and the abandoned-on-drop record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLedger {
    pub opened: Vec<TraceId>,
    pub closures: BTreeMap<String, usize>,
}

impl TraceLedger {
    pub fn from_path(path: impl AsRef<Path>) -> TelemetryResult<Self> {
        Ok(Self::from_events(&events(path)?))
    }

    pub fn from_events(events: &[StructuredEvent]) -> Self {
        let mut ledger = Self::default();
        for event in events {
            let Some(id) = event.trace_id() else {
                continue;
            };
            if event.event_type == EventType::TraceOpened {
                ledger.opened.push(id);
            } else if event.get("trace_name").is_some() {
                *ledger.closures.entry(id.to_string()).or_default() += 1;
            }
        }
        ledger
    }

    /// Times `id` was closed.
    pub fn closures_of(&self, id: TraceId) -> usize {
        self.closures.get(&id.to_string()).copied().unwrap_or(0)
    }

    /// True when every opened trace was closed exactly once and nothing
    /// unopened was closed.
    pub fn is_balanced(&self) -> bool {
        self.opened.len() == self.closures.len()
            && self.opened.iter().all(|id| self.closures_of(*id) == 1)
    }
}
