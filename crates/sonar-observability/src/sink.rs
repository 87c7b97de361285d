//! Telemetry sink
//!
//! Dual-destination recorder. Every call appends exactly one line to the
//! local [`EventLog`] before anything else happens, then forwards the record
//! to the [`RemoteExporter`] bounded by `remote_timeout`. Remote failures are
//! logged once as `telemetry_export_failed` and swallowed here; local
//! failures are returned to the caller.
//!
//! The sink is a cheap `Clone` handle. Build it once at startup and pass it
//! to whatever needs to record.

use crate::error::{RemoteExportError, TelemetryResult};
use crate::event::{EventData, EventType, Metric, StructuredEvent};
use crate::log::EventLog;
use crate::remote::{HttpExporter, NoopExporter, RemoteExporter};
use crate::trace::{TraceContext, TraceStatus};
use crate::{DEFAULT_ENVIRONMENT, DEFAULT_REMOTE_TIMEOUT, TelemetryConfig};
use chrono::Utc;
use serde_json::Value;
use sonar_core::TraceId;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use crate::metrics::MetricsRegistry;

/// Handle for recording events, metrics and traces.
#[derive(Clone)]
pub struct TelemetrySink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    log: EventLog,
    exporter: Arc<dyn RemoteExporter>,
    remote_timeout: Duration,
    context: EventData,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<MetricsRegistry>>,
}

impl std::fmt::Debug for TelemetrySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySink")
            .field("log_path", &self.inner.log.path())
            .field("exporter", &self.inner.exporter.name())
            .field("remote_timeout", &self.inner.remote_timeout)
            .finish()
    }
}

impl TelemetrySink {
    /// Start building a sink that writes to `log_path`.
    pub fn builder(log_path: impl Into<PathBuf>) -> TelemetrySinkBuilder {
        TelemetrySinkBuilder::new(log_path)
    }

    /// Build a sink from configuration.
    ///
    /// Remote export is enabled when credentials are present. If the HTTP
    /// exporter cannot be constructed the sink falls back to local-only
    /// recording with a warning.
    pub fn from_config(config: &TelemetryConfig) -> TelemetryResult<Self> {
        TelemetrySinkBuilder::from_config(config).build()
    }

    pub fn log_path(&self) -> &Path {
        self.inner.log.path()
    }

    pub fn remote_timeout(&self) -> Duration {
        self.inner.remote_timeout
    }

    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<&Arc<MetricsRegistry>> {
        self.inner.metrics.as_ref()
    }

    /// Record one structured event.
    ///
    /// The event is appended locally, then sent to the collector as a trace
    /// named after the event type, with `data.input` / `data.output` as its
    /// input and output and the whole payload as metadata.
    pub async fn record_event(
        &self,
        event_type: EventType,
        data: EventData,
    ) -> TelemetryResult<StructuredEvent> {
        let event = StructuredEvent::new(event_type, data);
        self.append_local(&event)?;

        let input = event.get("input").cloned().unwrap_or(Value::Null);
        let output = event.get("output").cloned().unwrap_or(Value::Null);
        self.export(
            "record_trace",
            self.inner.exporter.record_trace(
                event.event_type.as_str(),
                &input,
                &output,
                &event.data,
            ),
        )
        .await;

        Ok(event)
    }

    /// Record a named measurement against a trace.
    ///
    /// Locally this is a `metric_recorded` line; remotely a score.
    pub async fn record_metric(
        &self,
        trace_id: TraceId,
        name: &str,
        value: f64,
        tags: EventData,
    ) -> TelemetryResult<Metric> {
        let metric = Metric::new(trace_id, name, value, tags);
        let event = StructuredEvent::new(EventType::MetricRecorded, metric.to_event_data());
        self.append_local(&event)?;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_metric(name, value);
        }

        self.export(
            "record_score",
            self.inner
                .exporter
                .record_score(trace_id, name, value, &metric.tags),
        )
        .await;

        Ok(metric)
    }

    /// Open a root trace.
    ///
    /// Caller metadata is merged over the process-wide context
    /// (`environment`, creation `timestamp`).
    pub async fn open_trace(
        &self,
        name: &str,
        input: Value,
        metadata: EventData,
    ) -> TelemetryResult<TraceContext> {
        self.open_with_parent(name, input, metadata, None).await
    }

    pub(crate) async fn open_with_parent(
        &self,
        name: &str,
        input: Value,
        metadata: EventData,
        parent_id: Option<TraceId>,
    ) -> TelemetryResult<TraceContext> {
        let id = TraceId::generate();
        let started_at = Utc::now();

        let mut merged = self.inner.context.clone();
        merged.insert("timestamp".into(), Value::String(started_at.to_rfc3339()));
        merged.extend(metadata);

        let mut data = EventData::new();
        data.insert("trace_id".into(), Value::String(id.to_string()));
        data.insert("name".into(), Value::String(name.to_string()));
        data.insert("parent_id".into(), parent_value(parent_id));
        data.insert("input".into(), input.clone());
        data.insert("metadata".into(), Value::Object(merged.clone()));

        self.append_local(&StructuredEvent::new(EventType::TraceOpened, data))?;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_trace_opened();
        }

        // The context owns the closure from here on, so a caller dropping
        // this future during the export still gets `trace_abandoned`.
        let mut trace = TraceContext::new(
            self.clone(),
            id,
            name.to_string(),
            input,
            merged,
            parent_id,
            None,
            started_at,
            Instant::now(),
        );

        let remote_id = self
            .export(
                "create_trace",
                self.inner
                    .exporter
                    .create_trace(id, name, trace.input(), trace.metadata()),
            )
            .await;

        tracing::debug!(
            trace_id = %id,
            trace_name = name,
            parent_id = ?parent_id.map(|p| p.to_string()),
            remote = remote_id.is_some(),
            "Opened trace"
        );

        trace.set_remote_id(remote_id);
        Ok(trace)
    }

    /// Synchronous local append. Used directly by `Drop` paths.
    pub(crate) fn append_local(&self, event: &StructuredEvent) -> TelemetryResult<()> {
        self.inner.log.append(event)?;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_event(&event.event_type);
        }

        Ok(())
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    pub(crate) fn observe_closed(
        &self,
        status: TraceStatus,
        name: &str,
        is_root: bool,
        duration: Duration,
    ) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_trace_closed(status, name, is_root, duration);
        }
    }

    /// Run a remote call under the timeout and swallow its failure.
    async fn export<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RemoteExportError>>,
    ) -> Option<T> {
        let error = match tokio::time::timeout(self.inner.remote_timeout, call).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(RemoteExportError::Disabled)) => return None,
            Ok(Err(error)) => error,
            Err(_) => RemoteExportError::Timeout {
                timeout_ms: self.inner.remote_timeout.as_millis() as u64,
            },
        };

        tracing::warn!(
            event = "telemetry_export_failed",
            operation,
            exporter = self.inner.exporter.name(),
            kind = error.kind(),
            error = %error,
            "Remote telemetry export failed"
        );

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_export_failure(operation);
        }

        None
    }
}

pub(crate) fn parent_value(parent_id: Option<TraceId>) -> Value {
    parent_id
        .map(|p| Value::String(p.to_string()))
        .unwrap_or(Value::Null)
}

/// Builder for [`TelemetrySink`]
pub struct TelemetrySinkBuilder {
    log_path: PathBuf,
    exporter: Option<Arc<dyn RemoteExporter>>,
    remote_timeout: Duration,
    environment: String,
    context: EventData,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<MetricsRegistry>>,
}

impl TelemetrySinkBuilder {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            exporter: None,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            context: EventData::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Builder preloaded from configuration, for callers that still need to
    /// attach a metrics registry or extra context.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        let mut builder = Self::new(&config.log_path)
            .environment(&config.environment)
            .remote_timeout(config.remote_timeout);

        if let Some(remote) = &config.remote {
            match HttpExporter::new(remote, config.remote_timeout) {
                Ok(exporter) => {
                    builder = builder.exporter(exporter.with_environment(&config.environment));
                }
                Err(error) => {
                    tracing::warn!(
                        host = %remote.host,
                        error = %error,
                        "Remote exporter unavailable, recording locally only"
                    );
                }
            }
        }

        builder
    }

    /// Remote destination. Defaults to [`NoopExporter`].
    pub fn exporter(mut self, exporter: impl RemoteExporter + 'static) -> Self {
        self.exporter = Some(Arc::new(exporter));
        self
    }

    pub fn shared_exporter(mut self, exporter: Arc<dyn RemoteExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Extra process-wide metadata stamped on every trace.
    pub fn context_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[cfg(feature = "metrics")]
    pub fn metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Open the log and assemble the sink.
    pub fn build(self) -> TelemetryResult<TelemetrySink> {
        let log = EventLog::open(self.log_path)?;

        let mut context = self.context;
        context.insert("environment".into(), Value::String(self.environment));

        Ok(TelemetrySink {
            inner: Arc::new(SinkInner {
                log,
                exporter: self
                    .exporter
                    .unwrap_or_else(|| Arc::new(NoopExporter)),
                remote_timeout: self.remote_timeout,
                context,
                #[cfg(feature = "metrics")]
                metrics: self.metrics,
            }),
        })
    }
}
