//! Instrumented research agent loop
//!
//! A run moves through [`RunPhase`]s: it opens a root trace, asks the
//! [`ModelBackend`] for actions until it gets a final answer, and wraps each
//! tool call in a child trace. Every exit path closes the root trace before
//! the caller sees the outcome.

use crate::backend::{
    Action, ConversationState, FailureDecision, ModelBackend, Observation, ToolFailure, ToolSpec,
    Usage,
};
use crate::error::{AgentResult, AgentRunError};
use chrono::Utc;
use serde_json::{Value, json};
use sonar_core::{AgentId, ExecutionResult, ToolCall, ToolError, ToolExecutionError, TraceId};
use sonar_observability::{EventData, EventType, TelemetrySink, TraceContext};
use sonar_tools::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub const DEFAULT_AGENT_NAME: &str = "research_agent";
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Metric recorded once per successful run.
pub const TOKEN_USAGE: &str = "token_usage";

/// Event prefix for calls to tools that are not registered.
const UNKNOWN_TOOL_PREFIX: &str = "tool";

/// Identity and limits of an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: AgentId,
    /// Planning steps allowed per run before giving up.
    pub max_iterations: usize,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: AgentId::new_unchecked(DEFAULT_AGENT_NAME),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl AgentProfile {
    pub fn new(name: AgentId) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Name of the root trace for one run.
    pub fn trace_name(&self) -> String {
        format!("{}_execution", self.name)
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Started,
    Planning,
    ToolCall,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Started => "started",
            RunPhase::Planning => "planning",
            RunPhase::ToolCall => "tool_call",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub trace_id: TraceId,
    pub answer: String,
    /// Token usage summed over every planning step.
    pub usage: Usage,
    /// Planning steps taken, including the one that produced the answer.
    pub iterations: usize,
    pub tool_calls: usize,
    pub latency: Duration,
}

struct RunOutcome {
    answer: String,
    usage: Usage,
    iterations: usize,
    tool_calls: usize,
}

/// Research agent with a telemetry sink, a tool registry and a planner.
///
/// Cheap to clone; clones share the backend, registry and sink, so many
/// runs can execute concurrently.
#[derive(Clone)]
pub struct ResearchAgent {
    profile: AgentProfile,
    backend: Arc<dyn ModelBackend>,
    tools: Arc<dyn ToolRegistry>,
    sink: TelemetrySink,
}

impl std::fmt::Debug for ResearchAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchAgent")
            .field("profile", &self.profile)
            .field("backend", &self.backend.name())
            .field("tools", &self.tools.tool_names())
            .field("sink", &self.sink)
            .finish()
    }
}

impl ResearchAgent {
    pub fn new(
        profile: AgentProfile,
        backend: Arc<dyn ModelBackend>,
        tools: Arc<dyn ToolRegistry>,
        sink: TelemetrySink,
    ) -> Self {
        Self {
            profile,
            backend,
            tools,
            sink,
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn sink(&self) -> &TelemetrySink {
        &self.sink
    }

    /// Research `topic` and return the answer.
    ///
    /// # Errors
    ///
    /// Any failure is recorded as an `agent_error` event on the run's trace
    /// before it is returned. If that recording itself fails locally, the
    /// returned error is [`AgentRunError::Telemetry`] instead.
    pub async fn run(&self, topic: &str) -> AgentResult<RunReport> {
        let span = info_span!(
            "agent_run",
            agent = %self.profile.name,
            backend = self.backend.name(),
        );
        self.run_traced(topic).instrument(span).await
    }

    async fn run_traced(&self, topic: &str) -> AgentResult<RunReport> {
        let agent = self.profile.name.as_str();
        self.enter(RunPhase::Started);

        let mut metadata = EventData::new();
        metadata.insert("agent_type".into(), Value::String(agent.to_string()));
        let trace = self
            .sink
            .open_trace(&self.profile.trace_name(), json!({ "topic": topic }), metadata)
            .await?;

        let outcome = self.drive(&trace, topic).await;
        match outcome {
            Ok(outcome) => {
                self.enter(RunPhase::Completed);

                let mut data = EventData::new();
                data.insert("agent".into(), json!(agent));
                data.insert("topic".into(), json!(topic));
                data.insert("iterations".into(), json!(outcome.iterations));
                data.insert("tool_calls".into(), json!(outcome.tool_calls));
                let closed = trace
                    .succeed(EventType::AgentCompleted, data, outcome.answer.clone())
                    .await?;

                let mut tags = EventData::new();
                tags.insert("agent".into(), json!(agent));
                self.sink
                    .record_metric(
                        closed.id,
                        TOKEN_USAGE,
                        outcome.usage.total_tokens as f64,
                        tags,
                    )
                    .await?;

                info!(
                    trace_id = %closed.id,
                    iterations = outcome.iterations,
                    tool_calls = outcome.tool_calls,
                    total_tokens = outcome.usage.total_tokens,
                    latency_ms = closed.duration.as_millis() as u64,
                    "Research run completed"
                );

                Ok(RunReport {
                    trace_id: closed.id,
                    answer: outcome.answer,
                    usage: outcome.usage,
                    iterations: outcome.iterations,
                    tool_calls: outcome.tool_calls,
                    latency: closed.duration,
                })
            }
            Err(run_error) => {
                self.enter(RunPhase::Failed);
                let trace_id = trace.id();

                let mut data = EventData::new();
                data.insert("agent".into(), json!(agent));
                data.insert("error".into(), json!(run_error.to_string()));
                data.insert("input".into(), json!(topic));
                data.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
                trace.fail(EventType::AgentError, data, &run_error).await?;

                error!(
                    trace_id = %trace_id,
                    code = run_error.error_code(),
                    error = %run_error,
                    "Research run failed"
                );
                Err(run_error)
            }
        }
    }

    /// The planning loop. Never closes `trace`; the caller does.
    async fn drive(&self, trace: &TraceContext, topic: &str) -> AgentResult<RunOutcome> {
        if topic.trim().is_empty() {
            return Err(AgentRunError::InvalidTopic);
        }

        let tools = self
            .tools
            .descriptors()
            .into_iter()
            .map(|d| ToolSpec {
                name: d.name().to_string(),
                description: d.description().to_string(),
            })
            .collect();
        let mut state = ConversationState::new(self.profile.name.clone(), topic, tools);
        let mut usage = Usage::default();
        let mut tool_calls = 0;

        for iteration in 1..=self.profile.max_iterations {
            state.iteration = iteration;
            self.enter(RunPhase::Planning);

            let action = self.backend.plan_next_action(&state).await?;
            if let Some(step) = action.usage() {
                usage = usage + step;
            }

            match action {
                Action::FinalAnswer { answer, .. } => {
                    return Ok(RunOutcome {
                        answer,
                        usage,
                        iterations: iteration,
                        tool_calls,
                    });
                }
                Action::UseTool { tool, input, .. } => {
                    self.enter(RunPhase::ToolCall);
                    tool_calls += 1;
                    let observation = self.call_tool(trace, &tool, &input).await?;
                    state.push_turn(tool, input, observation);
                }
            }
        }

        Err(AgentRunError::PlanningLimitExceeded {
            limit: self.profile.max_iterations,
        })
    }

    /// Run one tool under a child trace.
    ///
    /// The child is closed before this returns. A failure either ends the run
    /// or comes back as an error observation, as the backend decides.
    async fn call_tool(
        &self,
        trace: &TraceContext,
        tool: &str,
        input: &str,
    ) -> AgentResult<Observation> {
        let span = info_span!("tool_call", tool = tool);
        self.call_tool_traced(trace, tool, input)
            .instrument(span)
            .await
    }

    async fn call_tool_traced(
        &self,
        trace: &TraceContext,
        tool: &str,
        input: &str,
    ) -> AgentResult<Observation> {
        let child = trace
            .child(tool, json!({ "query": input }), EventData::new())
            .await?;

        let (prefix, failure) = match ToolCall::new(tool, input) {
            Err(_) => (
                UNKNOWN_TOOL_PREFIX.to_string(),
                ToolFailure::Unknown(ToolError::not_found_by_name(tool)),
            ),
            Ok(call) => {
                let prefix = self
                    .tools
                    .descriptor(&call.tool)
                    .map(|d| d.event_prefix().to_string())
                    .unwrap_or_else(|| UNKNOWN_TOOL_PREFIX.to_string());

                match self.tools.invoke(&call) {
                    Err(unknown) => (prefix, ToolFailure::Unknown(unknown)),
                    Ok(ExecutionResult::Failure { reason }) => (
                        prefix,
                        ToolFailure::Execution(ToolExecutionError::new(call.tool, input, reason)),
                    ),
                    Ok(ExecutionResult::Success { output }) => {
                        let mut data = EventData::new();
                        data.insert("query".into(), json!(input));
                        data.insert("result_count".into(), json!(1));
                        data.insert("agent".into(), json!(self.profile.name.as_str()));
                        data.insert("latency".into(), json!(child.elapsed().as_secs_f64()));
                        child
                            .succeed(EventType::tool_executed(&prefix), data, output.clone())
                            .await?;
                        return Ok(Observation::Output(output));
                    }
                }
            }
        };

        let mut data = EventData::new();
        data.insert("query".into(), json!(input));
        data.insert("error".into(), json!(failure.to_string()));
        data.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
        child
            .fail(EventType::tool_error(&prefix), data, &failure)
            .await?;

        match self.backend.on_tool_failure(&failure) {
            FailureDecision::Abort => {
                warn!(error = %failure, "Tool call failed, aborting run");
                Err(failure.into())
            }
            FailureDecision::Continue => {
                warn!(error = %failure, "Tool call failed, continuing");
                Ok(Observation::Error(failure.to_string()))
            }
        }
    }

    fn enter(&self, phase: RunPhase) {
        debug!(agent = %self.profile.name, phase = phase.as_str(), "Run phase");
    }
}
