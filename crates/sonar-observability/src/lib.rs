//! Sonar Observability
//!
//! Trace lifecycle and dual-destination telemetry for Sonar agents. Every
//! unit of work is wrapped in a [`TraceContext`] obtained from a
//! [`TelemetrySink`]; events and metrics are appended to a local JSON Lines
//! log first and then forwarded, best effort, to a remote trace collector.
//!
//! ```rust,no_run
//! use sonar_observability::{EventData, EventType, TelemetrySink};
//!
//! # async fn demo() -> Result<(), sonar_observability::TelemetryError> {
//! let sink = TelemetrySink::builder("agent_logs.json").build()?;
//! let trace = sink
//!     .open_trace("research_agent_execution", serde_json::json!({"topic": "rust"}), EventData::new())
//!     .await?;
//! trace
//!     .succeed(EventType::AgentCompleted, EventData::new(), "done")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod log;
pub mod remote;
pub mod sink;
pub mod summary;
pub mod trace;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use error::{RemoteExportError, TelemetryError, TelemetryResult};
pub use event::{EventData, EventType, Metric, StructuredEvent};
pub use log::{EventLog, LogRead, read_events};
pub use remote::{HttpExporter, NoopExporter, RemoteExporter};
pub use sink::{TelemetrySink, TelemetrySinkBuilder};
pub use summary::LogSummary;
pub use trace::{ClosedTrace, TraceContext, TraceStatus};

#[cfg(feature = "metrics")]
pub use metrics::{MetricsError, MetricsRegistry};

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Latency buckets shared by the run and tool duration histograms.
/// Covers 5ms up to 10s.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.01,  // 10ms
    0.02,  // 20ms
    0.05,  // 50ms
    0.1,   // 100ms
    0.2,   // 200ms
    0.5,   // 500ms
    1.0,   // 1s
    2.5,   // 2.5s
    5.0,   // 5s
    10.0,  // 10s
];

/// Default location of the local event log.
pub const DEFAULT_LOG_PATH: &str = "agent_logs.json";

/// Default deployment environment stamped on every trace.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Default bound on every remote telemetry call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default remote collector host.
pub const DEFAULT_REMOTE_HOST: &str = "https://cloud.langfuse.com";

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Path of the append-only JSON Lines log
    pub log_path: PathBuf,
    /// Deployment environment (`development`, `production`, ...)
    pub environment: String,
    /// Remote collector credentials; `None` disables remote export
    pub remote: Option<RemoteConfig>,
    /// Upper bound on each remote call
    pub remote_timeout: Duration,
    /// Namespace prefix for Prometheus metric names
    pub namespace: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            remote: None,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            namespace: "sonar".to_string(),
        }
    }
}

/// Credentials and host of the remote trace collector.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub public_key: String,
    pub secret_key: String,
    pub host: String,
}

impl RemoteConfig {
    pub fn new(
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            host: host.into(),
        }
    }
}

// Keys never reach logs.
impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// Install the JSON `tracing` subscriber on stderr.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Stdout is left
/// free for command output.
#[cfg(feature = "subscriber")]
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ObservabilityError> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    tracing::info!(
        log_path = %config.log_path.display(),
        environment = %config.environment,
        remote_enabled = config.remote.is_some(),
        remote_timeout_ms = config.remote_timeout.as_millis() as u64,
        "Initialized structured tracing"
    );

    Ok(())
}

/// Observability setup errors
#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[cfg(feature = "metrics")]
    #[error("Metrics error: {0}")]
    Metrics(#[from] metrics::MetricsError),
}
