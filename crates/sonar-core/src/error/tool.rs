//! Tool lookup and execution errors.

use crate::identifiers::{IdValidationError, ToolId};
use crate::tool::FailureReason;

/// Errors raised while resolving a tool call against a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("Tool '{tool}' not found in registry")]
    NotFound {
        /// Validated tool identifier
        tool: ToolId,
    },

    /// Tool name failed validation before lookup.
    #[error("Invalid tool ID '{attempted_name}': {validation_error}")]
    InvalidToolId {
        /// The invalid tool name that was provided
        attempted_name: String,
        /// Validation error details
        validation_error: IdValidationError,
    },
}

impl ToolError {
    /// Create a NotFound error for a validated tool.
    pub fn not_found(tool: ToolId) -> Self {
        ToolError::NotFound { tool }
    }

    /// Create a NotFound error from a tool name string.
    pub fn not_found_by_name(name: &str) -> Self {
        match ToolId::parse(name) {
            Ok(tool) => ToolError::NotFound { tool },
            Err(validation_error) => ToolError::InvalidToolId {
                attempted_name: name.to_string(),
                validation_error,
            },
        }
    }

    /// Get the tool name as a string, if it was valid.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            ToolError::NotFound { tool } => Some(tool.as_str()),
            ToolError::InvalidToolId { .. } => None,
        }
    }
}

impl From<IdValidationError> for ToolError {
    fn from(err: IdValidationError) -> Self {
        ToolError::InvalidToolId {
            attempted_name: "unknown".to_string(),
            validation_error: err,
        }
    }
}

/// A registered tool's handler reported a failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Tool '{tool}' execution failed: {reason}")]
pub struct ToolExecutionError {
    tool: ToolId,
    input: String,
    reason: FailureReason,
}

impl ToolExecutionError {
    /// Wrap a handler failure with the call that produced it.
    pub fn new(tool: ToolId, input: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            tool,
            input: input.into(),
            reason,
        }
    }

    /// The tool whose handler failed.
    pub fn tool(&self) -> &ToolId {
        &self.tool
    }

    /// Input the handler was called with.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Structured failure reason reported by the handler.
    pub fn reason(&self) -> &FailureReason {
        &self.reason
    }
}

/// Result type alias for tool lookup.
pub type ToolResult<T> = Result<T, ToolError>;
