//! # Test Exporters
//!
//! Remote exporters that fail, stall or record, for exercising the sink's
//! export path without a collector.

use async_trait::async_trait;
use serde_json::Value;
use sonar_core::TraceId;
use sonar_observability::{EventData, RemoteExportError, RemoteExporter};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Rejects every call with a 503.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingExporter;

fn unavailable() -> RemoteExportError {
    RemoteExportError::Status {
        status: 503,
        body: "collector unavailable".to_string(),
    }
}

#[async_trait]
impl RemoteExporter for FailingExporter {
    fn name(&self) -> &str {
        "failing"
    }

    async fn create_trace(
        &self,
        _trace_id: TraceId,
        _name: &str,
        _input: &Value,
        _metadata: &EventData,
    ) -> Result<String, RemoteExportError> {
        Err(unavailable())
    }

    async fn record_score(
        &self,
        _trace_id: TraceId,
        _name: &str,
        _value: f64,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        Err(unavailable())
    }

    async fn record_trace(
        &self,
        _name: &str,
        _input: &Value,
        _output: &Value,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        Err(unavailable())
    }
}

/// Sleeps for `delay` before succeeding.
#[derive(Debug, Clone, Copy)]
pub struct SlowExporter {
    delay: Duration,
}

impl SlowExporter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RemoteExporter for SlowExporter {
    fn name(&self) -> &str {
        "slow"
    }

    async fn create_trace(
        &self,
        trace_id: TraceId,
        _name: &str,
        _input: &Value,
        _metadata: &EventData,
    ) -> Result<String, RemoteExportError> {
        tokio::time::sleep(self.delay).await;
        Ok(trace_id.to_string())
    }

    async fn record_score(
        &self,
        _trace_id: TraceId,
        _name: &str,
        _value: f64,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn record_trace(
        &self,
        _name: &str,
        _input: &Value,
        _output: &Value,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// One call received by a [`RecordingExporter`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExportCall {
    CreateTrace { trace_id: TraceId, name: String },
    Score { trace_id: TraceId, name: String, value: f64 },
    Trace { name: String, output: Value },
}

/// Accepts everything and remembers it.
#[derive(Debug, Default)]
pub struct RecordingExporter {
    calls: Mutex<Vec<ExportCall>>,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ExportCall> {
        lock(&self.calls).clone()
    }

    /// Scores named `name`, as `(trace_id, value)`
    pub fn scores(&self, name: &str) -> Vec<(TraceId, f64)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ExportCall::Score {
                    trace_id,
                    name: n,
                    value,
                } if n == name => Some((*trace_id, *value)),
                _ => None,
            })
            .collect()
    }

    /// Names of the event traces recorded, in order
    pub fn trace_names(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ExportCall::Trace { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteExporter for RecordingExporter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_trace(
        &self,
        trace_id: TraceId,
        name: &str,
        _input: &Value,
        _metadata: &EventData,
    ) -> Result<String, RemoteExportError> {
        lock(&self.calls).push(ExportCall::CreateTrace {
            trace_id,
            name: name.to_string(),
        });
        Ok(format!("recorded-{trace_id}"))
    }

    async fn record_score(
        &self,
        trace_id: TraceId,
        name: &str,
        value: f64,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        lock(&self.calls).push(ExportCall::Score {
            trace_id,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    async fn record_trace(
        &self,
        name: &str,
        _input: &Value,
        output: &Value,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        lock(&self.calls).push(ExportCall::Trace {
            name: name.to_string(),
            output: output.clone(),
        });
        Ok(())
    }
}
