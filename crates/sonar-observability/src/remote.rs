//! Remote trace collector
//!
//! The sink forwards every record to a [`RemoteExporter`] after it has been
//! written locally. Exporters report failures as [`RemoteExportError`]; the
//! sink is the only place those errors are handled.
//!
//! # Implementations
//!
//! | Exporter | Behavior |
//! |----------|----------|
//! | [`HttpExporter`] | Langfuse-style ingestion API, one batch item per call |
//! | [`NoopExporter`] | Remote export disabled; every call returns `Disabled` |
//!
//! The HTTP exporter does **not** retry. Each request carries the client
//! timeout, and the sink bounds the whole call again with its own timeout.

use crate::RemoteConfig;
use crate::error::RemoteExportError;
use crate::event::EventData;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use sonar_core::TraceId;
use std::time::Duration;
use tracing::debug;

/// Destination for trace, score and event records outside the process.
#[async_trait]
pub trait RemoteExporter: Send + Sync {
    /// Exporter name used in logs.
    fn name(&self) -> &str;

    /// Register a new trace and return the collector's id for it.
    async fn create_trace(
        &self,
        trace_id: TraceId,
        name: &str,
        input: &Value,
        metadata: &EventData,
    ) -> Result<String, RemoteExportError>;

    /// Attach a numeric score to an existing trace.
    async fn record_score(
        &self,
        trace_id: TraceId,
        name: &str,
        value: f64,
        metadata: &EventData,
    ) -> Result<(), RemoteExportError>;

    /// Record a standalone event as its own trace.
    async fn record_trace(
        &self,
        name: &str,
        input: &Value,
        output: &Value,
        metadata: &EventData,
    ) -> Result<(), RemoteExportError>;
}

/// Exporter used when no remote collector is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

#[async_trait]
impl RemoteExporter for NoopExporter {
    fn name(&self) -> &str {
        "noop"
    }

    async fn create_trace(
        &self,
        _trace_id: TraceId,
        _name: &str,
        _input: &Value,
        _metadata: &EventData,
    ) -> Result<String, RemoteExportError> {
        Err(RemoteExportError::Disabled)
    }

    async fn record_score(
        &self,
        _trace_id: TraceId,
        _name: &str,
        _value: f64,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        Err(RemoteExportError::Disabled)
    }

    async fn record_trace(
        &self,
        _name: &str,
        _input: &Value,
        _output: &Value,
        _metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        Err(RemoteExportError::Disabled)
    }
}

/// Per-item outcome reported by the ingestion endpoint.
#[derive(Debug, Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    errors: Vec<IngestionItemError>,
}

#[derive(Debug, Deserialize)]
struct IngestionItemError {
    #[serde(default)]
    status: u16,
    #[serde(default)]
    message: Option<String>,
}

/// Exporter for a Langfuse-compatible ingestion API.
///
/// Sends `POST {host}/api/public/ingestion` with HTTP basic auth
/// (public key / secret key) and a batch of exactly one item.
#[derive(Clone)]
pub struct HttpExporter {
    http: Client,
    endpoint: String,
    public_key: String,
    secret_key: String,
    environment: Option<String>,
}

impl std::fmt::Debug for HttpExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExporter")
            .field("endpoint", &self.endpoint)
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl HttpExporter {
    /// Create an exporter whose requests time out after `timeout`.
    pub fn new(config: &RemoteConfig, timeout: Duration) -> Result<Self, RemoteExportError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("sonar-observability/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/api/public/ingestion",
                config.host.trim_end_matches('/')
            ),
            public_key: config.public_key.clone(),
            secret_key: config.secret_key.clone(),
            environment: None,
        })
    }

    /// Tag every trace with a deployment environment.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn trace_body(
        &self,
        id: String,
        name: &str,
        input: &Value,
        output: Option<&Value>,
        metadata: &EventData,
    ) -> Value {
        let mut body = json!({
            "id": id,
            "name": name,
            "timestamp": Utc::now().to_rfc3339(),
            "input": input,
            "metadata": metadata,
        });
        if let Some(output) = output {
            body["output"] = output.clone();
        }
        if let Some(environment) = &self.environment {
            body["environment"] = Value::String(environment.clone());
        }
        body
    }

    async fn ingest(&self, kind: &str, body: Value) -> Result<(), RemoteExportError> {
        let batch = json!({
            "batch": [{
                "id": uuid::Uuid::new_v4().to_string(),
                "timestamp": Utc::now().to_rfc3339(),
                "type": kind,
                "body": body,
            }]
        });

        debug!(endpoint = %self.endpoint, kind, "Sending ingestion batch");

        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteExportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // 207 Multi-Status carries per-item failures in the body.
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(());
        }
        let parsed: IngestionResponse =
            serde_json::from_str(&text).map_err(|e| RemoteExportError::Decode(e.to_string()))?;

        match parsed.errors.into_iter().next() {
            Some(item) => Err(RemoteExportError::Status {
                status: item.status,
                body: item.message.unwrap_or_default(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteExporter for HttpExporter {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_trace(
        &self,
        trace_id: TraceId,
        name: &str,
        input: &Value,
        metadata: &EventData,
    ) -> Result<String, RemoteExportError> {
        let id = trace_id.to_string();
        let body = self.trace_body(id.clone(), name, input, None, metadata);
        self.ingest("trace-create", body).await?;
        Ok(id)
    }

    async fn record_score(
        &self,
        trace_id: TraceId,
        name: &str,
        value: f64,
        metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        let comment = serde_json::to_string(metadata)
            .map_err(|e| RemoteExportError::Decode(e.to_string()))?;
        let body = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "traceId": trace_id.to_string(),
            "name": name,
            "value": value,
            "comment": comment,
        });
        self.ingest("score-create", body).await
    }

    async fn record_trace(
        &self,
        name: &str,
        input: &Value,
        output: &Value,
        metadata: &EventData,
    ) -> Result<(), RemoteExportError> {
        let body = self.trace_body(
            uuid::Uuid::new_v4().to_string(),
            name,
            input,
            Some(output),
            metadata,
        );
        self.ingest("trace-create", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_exporter_reports_disabled() {
        let exporter = NoopExporter;
        let result = exporter
            .create_trace(TraceId::generate(), "run", &Value::Null, &EventData::new())
            .await;
        assert!(matches!(result, Err(RemoteExportError::Disabled)));

        let result = exporter
            .record_score(TraceId::generate(), "latency", 1.0, &EventData::new())
            .await;
        assert!(matches!(result, Err(RemoteExportError::Disabled)));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let config = RemoteConfig::new("pk", "sk", "https://collector.example.com/");
        let exporter = HttpExporter::new(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(
            exporter.endpoint(),
            "https://collector.example.com/api/public/ingestion"
        );
    }

    #[test]
    fn debug_hides_secret_key() {
        let config = RemoteConfig::new("pk-public", "sk-secret", "http://localhost");
        let exporter = HttpExporter::new(&config, Duration::from_secs(1)).unwrap();
        let rendered = format!("{exporter:?}");
        assert!(rendered.contains("pk-public"));
        assert!(!rendered.contains("sk-secret"));
    }
}
