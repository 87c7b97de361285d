//! # Sonar Core
//!
//! Core identifiers, tool types and error taxonomy shared by every Sonar crate.
//! The telemetry pipeline, tool registry and agent loop all speak in terms of
//! the types defined here.

pub mod error;
pub mod identifiers;
pub mod tool;

pub use error::{ToolError, ToolExecutionError, ToolResult};
pub use identifiers::{AgentId, IdValidationError, IdValidator, ToolId, TraceId};
pub use tool::{ExecutionResult, FailureReason, Tool, ToolCall};
