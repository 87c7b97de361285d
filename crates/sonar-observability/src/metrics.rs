//! Prometheus mirror
//!
//! In-process counters and histograms that shadow what the sink writes to
//! the local log. Each `MetricsRegistry` owns a private Prometheus
//! `Registry`, so several sinks (or tests) never collide on metric names.

use crate::LATENCY_BUCKETS;
use crate::event::EventType;
use crate::trace::TraceStatus;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;
use thiserror::Error;

/// Metrics mirrored from telemetry traffic
#[derive(Debug)]
pub struct MetricsRegistry {
    registry: Registry,
    events_total: CounterVec,       // cardinality: event types
    export_failures_total: CounterVec, // cardinality: 3 (operation)
    traces_opened_total: Counter,
    traces_closed_total: CounterVec, // cardinality: 3 (status)
    run_duration_seconds: Histogram,
    tool_duration_seconds: HistogramVec, // cardinality: registered tools
    token_usage_last: Gauge,
}

impl MetricsRegistry {
    /// Create the mirror with every metric name prefixed by `namespace`.
    pub fn new(namespace: &str) -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let events_total = CounterVec::new(
            Opts::new(
                format!("{namespace}_events_total"),
                "Structured events appended to the local log by type",
            ),
            &["event_type"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let export_failures_total = CounterVec::new(
            Opts::new(
                format!("{namespace}_export_failures_total"),
                "Remote export calls that failed or timed out by operation",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(export_failures_total.clone()))?;

        let traces_opened_total = Counter::with_opts(Opts::new(
            format!("{namespace}_traces_opened_total"),
            "Trace contexts opened",
        ))?;
        registry.register(Box::new(traces_opened_total.clone()))?;

        let traces_closed_total = CounterVec::new(
            Opts::new(
                format!("{namespace}_traces_closed_total"),
                "Trace contexts closed by outcome",
            ),
            &["status"],
        )?;
        registry.register(Box::new(traces_closed_total.clone()))?;

        let run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                format!("{namespace}_run_duration_seconds"),
                "Agent run duration in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        let tool_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{namespace}_tool_duration_seconds"),
                "Tool call duration in seconds by tool",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["tool"],
        )?;
        registry.register(Box::new(tool_duration_seconds.clone()))?;

        let token_usage_last = Gauge::with_opts(Opts::new(
            format!("{namespace}_token_usage_last"),
            "Token usage reported by the most recent run",
        ))?;
        registry.register(Box::new(token_usage_last.clone()))?;

        Ok(Self {
            registry,
            events_total,
            export_failures_total,
            traces_opened_total,
            traces_closed_total,
            run_duration_seconds,
            tool_duration_seconds,
            token_usage_last,
        })
    }

    /// Get the Prometheus registry backing this mirror
    pub fn prometheus_registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_event(&self, event_type: &EventType) {
        self.events_total
            .with_label_values(&[event_type.as_str()])
            .inc();
    }

    pub fn record_export_failure(&self, operation: &str) {
        self.export_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_trace_opened(&self) {
        self.traces_opened_total.inc();
    }

    /// Count a closed trace and observe its duration.
    ///
    /// Root traces feed the run histogram; children feed the tool histogram
    /// labelled by trace name.
    pub fn record_trace_closed(
        &self,
        status: TraceStatus,
        name: &str,
        is_root: bool,
        duration: Duration,
    ) {
        self.traces_closed_total
            .with_label_values(&[status.as_str()])
            .inc();

        if status == TraceStatus::Abandoned {
            return;
        }
        if is_root {
            self.run_duration_seconds.observe(duration.as_secs_f64());
        } else {
            self.tool_duration_seconds
                .with_label_values(&[name])
                .observe(duration.as_secs_f64());
        }
    }

    /// Mirror a named metric recorded through the sink.
    pub fn record_metric(&self, name: &str, value: f64) {
        if name == "token_usage" {
            self.token_usage_last.set(value);
        }
    }

    /// Render every metric in Prometheus text exposition format.
    pub fn gather_text(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}

/// Metrics system errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics encoding error: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_do_not_collide() {
        let first = MetricsRegistry::new("sonar").unwrap();
        let second = MetricsRegistry::new("sonar").unwrap();

        first.record_trace_opened();
        assert_eq!(first.traces_opened_total.get(), 1.0);
        assert_eq!(second.traces_opened_total.get(), 0.0);
    }

    #[test]
    fn closed_traces_split_by_depth() {
        let registry = MetricsRegistry::new("test").unwrap();

        registry.record_trace_closed(
            TraceStatus::Success,
            "research_agent_execution",
            true,
            Duration::from_millis(120),
        );
        registry.record_trace_closed(
            TraceStatus::Failure,
            "web_search",
            false,
            Duration::from_millis(5),
        );

        assert_eq!(registry.run_duration_seconds.get_sample_count(), 1);
        assert_eq!(
            registry
                .tool_duration_seconds
                .with_label_values(&["web_search"])
                .get_sample_count(),
            1
        );
        assert_eq!(
            registry
                .traces_closed_total
                .with_label_values(&["failure"])
                .get(),
            1.0
        );
    }

    #[test]
    fn token_usage_gauge_tracks_latest_value() {
        let registry = MetricsRegistry::new("test").unwrap();
        registry.record_metric("token_usage", 150.0);
        registry.record_metric("execution_latency", 0.3);
        registry.record_metric("token_usage", 90.0);
        assert_eq!(registry.token_usage_last.get(), 90.0);
    }

    #[test]
    fn exposition_contains_namespaced_names() {
        let registry = MetricsRegistry::new("sonar").unwrap();
        registry.record_event(&EventType::SearchExecuted);
        registry.record_export_failure("record_trace");

        let text = registry.gather_text().unwrap();
        assert!(text.contains("sonar_events_total"));
        assert!(text.contains("event_type=\"search_executed\""));
        assert!(text.contains("sonar_export_failures_total"));
    }
}
