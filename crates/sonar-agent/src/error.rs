//! Error types for agent runs and model backends.

use crate::backend::ToolFailure;
use sonar_core::{ToolError, ToolExecutionError};
use sonar_observability::TelemetryError;
use thiserror::Error;

/// Errors reported by a model backend while planning.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure talking to the model endpoint.
    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model endpoint answered with a non-success status.
    #[error("Model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be understood.
    #[error("Failed to decode model response: {0}")]
    Decode(String),

    /// The model declined to produce an answer.
    #[error("Model refused to answer: {0}")]
    Refused(String),

    /// The backend is not usable as configured.
    #[error("Model backend misconfigured: {0}")]
    Config(String),
}

/// Why an agent run failed.
///
/// Every variant is returned only after the run's `agent_error` event has
/// been recorded, except `Telemetry`, which means that recording itself
/// failed.
#[derive(Debug, Error)]
pub enum AgentRunError {
    #[error("Planning failed: {0}")]
    Planning(#[from] BackendError),

    #[error(transparent)]
    Tool(#[from] ToolExecutionError),

    #[error(transparent)]
    UnknownTool(#[from] ToolError),

    #[error("Planning did not finish within {limit} iterations")]
    PlanningLimitExceeded { limit: usize },

    #[error("Telemetry recording failed: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Research topic is empty")]
    InvalidTopic,
}

impl AgentRunError {
    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            AgentRunError::Planning(_) => "PLANNING_FAILED",
            AgentRunError::Tool(_) => "TOOL_FAILED",
            AgentRunError::UnknownTool(_) => "UNKNOWN_TOOL",
            AgentRunError::PlanningLimitExceeded { .. } => "PLANNING_LIMIT_EXCEEDED",
            AgentRunError::Telemetry(_) => "TELEMETRY_FAILED",
            AgentRunError::InvalidTopic => "INVALID_TOPIC",
        }
    }
}

impl From<ToolFailure> for AgentRunError {
    fn from(failure: ToolFailure) -> Self {
        match failure {
            ToolFailure::Execution(error) => AgentRunError::Tool(error),
            ToolFailure::Unknown(error) => AgentRunError::UnknownTool(error),
        }
    }
}

/// Result type for agent runs.
pub type AgentResult<T> = Result<T, AgentRunError>;
