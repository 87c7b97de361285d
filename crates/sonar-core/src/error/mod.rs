//! Error Types
//!
//! Tool lookup and tool execution errors shared by the registry and the
//! agent loop. Telemetry and run-level errors live next to the code that
//! raises them (`sonar-observability`, `sonar-agent`).

mod tool;

pub use tool::{ToolError, ToolExecutionError, ToolResult};
