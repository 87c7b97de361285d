//! # Sonar
//!
//! Sonar runs a research agent that picks and invokes tools to answer a
//! topic, and records every unit of work as a trace. Events and metrics land
//! in an append-only local log first and are then forwarded, best effort, to
//! a remote trace collector.
//!
//! ## Core Components
//!
//! - **[TelemetrySink]**: the one place events, metrics and traces are written
//! - **[TraceContext]**: a scoped unit of work, closed exactly once
//! - **[ToolRegistry]**: name to tool dispatch with per-tool event prefixes
//! - **[ResearchAgent]**: the planning loop, instrumented end to end
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sonar::{AgentProfile, KeywordBackend, ResearchAgent, TelemetrySink, research_tools};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = TelemetrySink::builder("agent_logs.json").build()?;
//! let agent = ResearchAgent::new(
//!     AgentProfile::default(),
//!     Arc::new(KeywordBackend),
//!     Arc::new(research_tools()?),
//!     sink,
//! );
//!
//! let report = agent.run("quantum computing").await?;
//! println!("{} ({} tool calls)", report.answer, report.tool_calls);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Failures are recorded before they propagate: a failing tool writes its
//! `*_error` event, the run writes `agent_error`, and only then does the
//! caller see the `Err`. Remote export problems never propagate at all.

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use sonar_agent as agent;
pub use sonar_core as core;
pub use sonar_observability as observability;
pub use sonar_tools as tools;

#[cfg(feature = "testing")]
pub use sonar_testing as testing;

// ============================================================================
// Identifiers and tool types
// ============================================================================

pub use sonar_core::{
    AgentId, ExecutionResult, FailureReason, IdValidationError, Tool, ToolCall, ToolError,
    ToolExecutionError, ToolId, ToolResult, TraceId,
};

// ============================================================================
// Telemetry
// ============================================================================

pub use sonar_observability::{
    ClosedTrace, EventData, EventType, HttpExporter, LogSummary, Metric, NoopExporter,
    ObservabilityError, RemoteConfig, RemoteExportError, RemoteExporter, StructuredEvent,
    TelemetryConfig, TelemetryError, TelemetryResult, TelemetrySink, TelemetrySinkBuilder,
    TraceContext, TraceStatus, read_events,
};

#[cfg(feature = "metrics")]
pub use sonar_observability::{MetricsError, MetricsRegistry};

#[cfg(feature = "subscriber")]
pub use sonar_observability::init_tracing;

// ============================================================================
// Tools
// ============================================================================

pub use sonar_tools::{
    InMemoryToolRegistry, SummarizeTool, ToolDescriptor, ToolRegistry, WebSearchTool,
    research_tools,
};

// ============================================================================
// Agent loop and backends
// ============================================================================

pub use sonar_agent::{
    Action, AgentProfile, AgentResult, AgentRunError, BackendError, ConfigError,
    ConversationState, FailureDecision, KeywordBackend, ModelBackend, OpenAiBackend,
    OpenAiConfig, ResearchAgent, RunReport, SonarConfig, SonarConfigBuilder, Usage,
};
