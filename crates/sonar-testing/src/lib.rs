//! # Sonar Testing
//!
//! Test doubles and harnesses for the Sonar research agent.
//!
//! ## Components
//!
//! - **Mock Tools**: predictable tools with call tracking ([`MockTool`], [`MockToolRegistry`])
//! - **Scripted Backend**: deterministic planning ([`ScriptedBackend`])
//! - **Exporters**: remote exporters that fail, stall or record
//! - **Logs**: readers and a [`TraceLedger`] for asserting on the event log
//! - **Harness**: an agent wired to all of the above over a temporary log
//!
//! ## Usage
//!
//! ```rust
//! use sonar_testing::{AgentHarness, ScriptedBackend};
//!
//! # tokio_test::block_on(async {
//! let harness = AgentHarness::builder()
//!     .backend(ScriptedBackend::single_tool("web_search", "quantum computing"))
//!     .build()
//!     .unwrap();
//!
//! let report = harness.agent().run("quantum computing").await.unwrap();
//! assert!(report.answer.contains("quantum computing"));
//! assert!(harness.ledger().unwrap().is_balanced());
//! # });
//! ```

/// Scripted model backend
pub mod backend;
/// Remote exporters for failure and latency scenarios
pub mod exporters;
/// Agent test harness over a temporary log
pub mod harness;
/// Event log inspection
pub mod logs;
/// Mock tools for predictable testing
pub mod mock_tools;

pub use backend::ScriptedBackend;
pub use exporters::{ExportCall, FailingExporter, RecordingExporter, SlowExporter};
pub use harness::{AgentHarness, AgentHarnessBuilder, HarnessError};
pub use logs::{TraceLedger, count_events, events, events_of_type, metrics_named};
pub use mock_tools::{MockTool, MockToolRegistry};
