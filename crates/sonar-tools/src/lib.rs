//! # Sonar Tools
//!
//! Tool registry and the stock research tools used by the Sonar agent.
//!
//! Tools are plain synchronous handlers behind the [`Tool`] trait. The
//! registry only describes and dispatches them; tracing tool calls is the
//! agent loop's job.
//!
//! ## Research tools
//! - `web_search`: offline stub that echoes the query as a search result
//! - `summarize`: extractive summary (leading sentences, bounded length)

/// Tool registry implementations for managing collections of tools.
pub mod registry;
/// Research tools shipped with the agent.
pub mod research;

pub use registry::{InMemoryToolRegistry, ToolDescriptor, ToolRegistry};
pub use research::{SummarizeConfig, SummarizeTool, WebSearchTool, research_tools};
pub use sonar_core::{ExecutionResult, FailureReason, Tool, ToolCall, ToolError, ToolId};
