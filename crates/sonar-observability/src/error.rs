//! Telemetry error types.
//!
//! `TelemetryError` is what callers see: the local log could not be written.
//! `RemoteExportError` never leaves the sink.

use std::path::PathBuf;

/// Failure to record telemetry locally.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The local event log could not be opened or appended to.
    #[error("Failed to persist telemetry to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An event could not be rendered as JSON.
    #[error("Failed to serialize telemetry record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The log writer lock was poisoned by a panicking writer.
    #[error("Event log lock poisoned")]
    Lock,
}

impl TelemetryError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TelemetryError::Persistence {
            path: path.into(),
            source,
        }
    }
}

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Failure talking to the remote trace collector.
#[derive(Debug, thiserror::Error)]
pub enum RemoteExportError {
    #[error("Remote export request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote collector returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Remote export timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to decode remote response: {0}")]
    Decode(String),

    #[error("Remote export is disabled")]
    Disabled,
}

impl RemoteExportError {
    /// Short label for logs and the `export_failures_total` mirror.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteExportError::Http(_) => "http",
            RemoteExportError::Status { .. } => "status",
            RemoteExportError::Timeout { .. } => "timeout",
            RemoteExportError::Decode(_) => "decode",
            RemoteExportError::Disabled => "disabled",
        }
    }
}
