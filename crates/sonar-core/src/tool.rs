use crate::identifiers::{IdValidationError, ToolId};

/// A request to invoke a specific tool with input data.
///
/// `ToolCall` represents the model backend's intent to use a capability.
/// The registry routes it to the handler registered under `tool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Validated name of the tool to invoke.
    pub tool: ToolId,

    /// The input data to pass to the tool.
    ///
    /// Tools are responsible for parsing and validating this input.
    pub input: String,
}

impl ToolCall {
    /// Create a new ToolCall, validating the tool name.
    ///
    /// # Returns
    ///
    /// `Ok(ToolCall)` if the name is valid, `Err(IdValidationError)` otherwise
    pub fn new(name: &str, input: impl Into<String>) -> Result<Self, IdValidationError> {
        Ok(Self {
            tool: ToolId::parse(name)?,
            input: input.into(),
        })
    }

    /// Name of the tool being called.
    pub fn name(&self) -> &str {
        self.tool.as_str()
    }
}

/// Categorized failure reasons for tool execution.
///
/// This enum provides structured error information instead of plain strings,
/// making it easier to handle different failure types programmatically.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// Invalid or malformed input provided to the tool
    InvalidInput {
        /// Description of what was invalid
        message: String,
    },
    /// Required resource not found (document, URL, etc.)
    NotFound {
        /// What was not found
        resource: String,
    },
    /// Network-related failure
    NetworkError {
        /// Description of the network issue
        message: String,
    },
    /// Timeout exceeded
    Timeout {
        /// What operation timed out
        operation: String,
    },
    /// Internal tool error or unexpected state
    InternalError {
        /// Description of the internal error
        message: String,
    },
    /// Custom error for tool-specific failures
    Custom {
        /// Error category or code
        category: String,
        /// Error message
        message: String,
    },
}

impl FailureReason {
    /// Get a human-readable error message
    pub fn message(&self) -> String {
        match self {
            FailureReason::InvalidInput { message } => format!("Invalid input: {}", message),
            FailureReason::NotFound { resource } => format!("Not found: {}", resource),
            FailureReason::NetworkError { message } => format!("Network error: {}", message),
            FailureReason::Timeout { operation } => format!("Timeout: {}", operation),
            FailureReason::InternalError { message } => format!("Internal error: {}", message),
            FailureReason::Custom { category, message } => format!("{}: {}", category, message),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// The result of executing a tool.
///
/// Either successful execution with output, or a failure with a structured
/// reason. The registry hands this back untouched; turning a failure into an
/// error is the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Tool executed successfully with the given output.
    Success { output: String },

    /// Tool execution failed with a structured reason.
    Failure { reason: FailureReason },
}

impl ExecutionResult {
    /// Create a successful execution result.
    pub fn success(output: impl Into<String>) -> Self {
        ExecutionResult::Success {
            output: output.into(),
        }
    }

    /// Create a failed execution result with a structured reason.
    pub fn failed(reason: FailureReason) -> Self {
        ExecutionResult::Failure { reason }
    }

    /// Create a failed execution result from a plain error message.
    ///
    /// The message is wrapped in `FailureReason::InternalError`.
    pub fn failure(error_message: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            reason: FailureReason::InternalError {
                message: error_message.into(),
            },
        }
    }

    /// Check if the execution was successful.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Check if the execution failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionResult::Failure { .. })
    }

    /// Get the output string (for success) or error message (for failure).
    pub fn output(&self) -> String {
        match self {
            ExecutionResult::Success { output } => output.clone(),
            ExecutionResult::Failure { reason } => reason.message(),
        }
    }

    /// Get the failure reason if available.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Failure { reason } => Some(reason),
        }
    }
}

/// A named capability the agent may invoke.
///
/// Handlers are plain synchronous functions of their input; they hold no
/// orchestration logic and know nothing about telemetry.
///
/// # Example
///
/// ```rust
/// use sonar_core::tool::{ExecutionResult, FailureReason, Tool};
///
/// struct WordCount;
///
/// impl Tool for WordCount {
///     fn name(&self) -> &str {
///         "word_count"
///     }
///
///     fn description(&self) -> &str {
///         "Counts whitespace separated words"
///     }
///
///     fn call(&self, input: String) -> ExecutionResult {
///         if input.trim().is_empty() {
///             return ExecutionResult::failed(FailureReason::InvalidInput {
///                 message: "empty input".to_string(),
///             });
///         }
///         ExecutionResult::success(input.split_whitespace().count().to_string())
///     }
/// }
///
/// assert_eq!(WordCount.call("a b c".into()).output(), "3");
/// ```
pub trait Tool: Send + Sync {
    /// Returns the unique name identifier for this tool.
    fn name(&self) -> &str;

    /// Returns a human-readable description of the tool.
    ///
    /// Shown to the model backend when it chooses the next action.
    fn description(&self) -> &str {
        ""
    }

    /// Execute the tool with the provided input.
    fn call(&self, input: String) -> ExecutionResult;
}
