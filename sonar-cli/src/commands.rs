//! Command implementations. Each returns the text to print on stdout.

use serde_json::{Value, json};
use sonar::{
    AgentRunError, BackendError, ConfigError, KeywordBackend, LogSummary, MetricsError,
    MetricsRegistry, ModelBackend, OpenAiBackend, ResearchAgent, RunReport, SonarConfig,
    TelemetryError, TelemetrySinkBuilder, ToolError, ToolRegistry, research_tools,
};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Tools(#[from] ToolError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Run(#[from] AgentRunError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Research `topic` with the configured backend and print the report.
pub async fn run_research(
    config: &SonarConfig,
    topic: &str,
    show_metrics: bool,
) -> Result<String, CliError> {
    let metrics = if show_metrics {
        Some(Arc::new(MetricsRegistry::new(&config.telemetry.namespace)?))
    } else {
        None
    };

    let mut sink = TelemetrySinkBuilder::from_config(&config.telemetry);
    if let Some(metrics) = &metrics {
        sink = sink.metrics(metrics.clone());
    }

    let agent = ResearchAgent::new(
        config.profile(),
        backend(config)?,
        Arc::new(research_tools()?),
        sink.build()?,
    );

    let report = agent.run(topic).await?;
    let mut output = serde_json::to_string_pretty(&report_json(&report))?;

    if let Some(metrics) = metrics {
        output.push('\n');
        output.push_str(&metrics.gather_text()?);
    }

    Ok(output)
}

/// The OpenAI-compatible backend when a key is configured, otherwise the
/// offline keyword planner.
fn backend(config: &SonarConfig) -> Result<Arc<dyn ModelBackend>, CliError> {
    match &config.openai {
        Some(openai) => Ok(Arc::new(OpenAiBackend::new(openai.clone())?)),
        None => {
            tracing::info!("OPENAI_API_KEY not set, using the offline keyword backend");
            Ok(Arc::new(KeywordBackend::new()))
        }
    }
}

fn report_json(report: &RunReport) -> Value {
    json!({
        "trace_id": report.trace_id.to_string(),
        "answer": report.answer,
        "usage": report.usage,
        "iterations": report.iterations,
        "tool_calls": report.tool_calls,
        "latency_ms": report.latency.as_millis() as u64,
    })
}

/// Dashboard summary of the log at `path`.
pub fn summarize_log(path: &Path) -> Result<String, CliError> {
    let summary = LogSummary::from_path(path)?;
    Ok(serde_json::to_string_pretty(&summary)?)
}

/// One line per stock tool: name, event prefix, description.
pub fn list_tools() -> Result<String, CliError> {
    let registry = research_tools()?;
    let lines: Vec<String> = registry
        .descriptors()
        .into_iter()
        .map(|d| format!("{}\t{}\t{}", d.name(), d.event_prefix(), d.description()))
        .collect();
    Ok(lines.join("\n"))
}
