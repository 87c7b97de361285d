//! # Sonar Agent
//!
//! The instrumented research agent: a planning loop driven by a
//! [`ModelBackend`], tools from a [`sonar_tools::ToolRegistry`], and a trace
//! for every run and every tool call recorded through a
//! [`sonar_observability::TelemetrySink`].
//!
//! ## Backends
//! - [`OpenAiBackend`]: OpenAI-compatible chat completions with function tools
//! - [`KeywordBackend`]: offline, deterministic search-summarize-answer script
//!
//! ## Example
//!
//! ```rust,no_run
//! use sonar_agent::{AgentProfile, KeywordBackend, ResearchAgent};
//! use sonar_observability::TelemetrySink;
//! use sonar_tools::research_tools;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = TelemetrySink::builder("agent_logs.json").build()?;
//! let agent = ResearchAgent::new(
//!     AgentProfile::default(),
//!     Arc::new(KeywordBackend::new()),
//!     Arc::new(research_tools()?),
//!     sink,
//! );
//! let report = agent.run("quantum computing").await?;
//! println!("{}", report.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod backend;
pub mod config;
pub mod error;
pub mod keyword;
pub mod openai;

pub use agent::{
    AgentProfile, DEFAULT_AGENT_NAME, DEFAULT_MAX_ITERATIONS, ResearchAgent, RunPhase, RunReport,
    TOKEN_USAGE,
};
pub use backend::{
    Action, ConversationState, FailureDecision, ModelBackend, Observation, ToolFailure, ToolSpec,
    Turn, Usage,
};
pub use config::{ConfigError, SonarConfig, SonarConfigBuilder};
pub use error::{AgentResult, AgentRunError, BackendError};
pub use keyword::KeywordBackend;
pub use openai::{OpenAiBackend, OpenAiConfig};
