//! Model backend contract.
//!
//! The agent loop asks a [`ModelBackend`] for the next [`Action`] given the
//! [`ConversationState`] so far. Backends hold no run state of their own; a
//! single backend serves many concurrent runs.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sonar_core::{AgentId, ToolError, ToolExecutionError};
use std::fmt;
use std::ops::Add;

/// Token accounting reported by a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

/// What the model wants to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Stop and answer.
    FinalAnswer {
        answer: String,
        usage: Option<Usage>,
    },
    /// Call a tool. `tool` is the raw name chosen by the model.
    UseTool {
        tool: String,
        input: String,
        usage: Option<Usage>,
    },
}

impl Action {
    pub fn usage(&self) -> Option<Usage> {
        match self {
            Action::FinalAnswer { usage, .. } | Action::UseTool { usage, .. } => *usage,
        }
    }
}

/// Tool as presented to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// Result of one tool call, fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Output(String),
    Error(String),
}

impl Observation {
    pub fn text(&self) -> &str {
        match self {
            Observation::Output(text) | Observation::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Observation::Error(_))
    }
}

/// One completed tool step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub tool: String,
    pub input: String,
    pub observation: Observation,
}

/// Everything the model sees when planning.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub agent: AgentId,
    pub topic: String,
    pub tools: Vec<ToolSpec>,
    pub turns: Vec<Turn>,
    /// 1-based planning step currently being decided.
    pub iteration: usize,
}

impl ConversationState {
    pub fn new(agent: AgentId, topic: impl Into<String>, tools: Vec<ToolSpec>) -> Self {
        Self {
            agent,
            topic: topic.into(),
            tools,
            turns: Vec::new(),
            iteration: 0,
        }
    }

    pub fn push_turn(
        &mut self,
        tool: impl Into<String>,
        input: impl Into<String>,
        observation: Observation,
    ) {
        self.turns.push(Turn {
            tool: tool.into(),
            input: input.into(),
            observation,
        });
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Whether `tool` has already been called in this run.
    pub fn has_used(&self, tool: &str) -> bool {
        self.turns.iter().any(|t| t.tool == tool)
    }
}

/// A tool call that did not produce output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// The handler ran and reported failure.
    Execution(ToolExecutionError),
    /// No tool with that name is registered.
    Unknown(ToolError),
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolFailure::Execution(error) => write!(f, "{error}"),
            ToolFailure::Unknown(error) => write!(f, "{error}"),
        }
    }
}

/// What to do after a tool failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureDecision {
    /// Fail the run with the tool's error.
    #[default]
    Abort,
    /// Show the failure to the model as an observation and keep planning.
    Continue,
}

/// Chooses the agent's next action.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Decide the next step for a run.
    async fn plan_next_action(&self, state: &ConversationState) -> Result<Action, BackendError>;

    /// Decide whether a failed tool call ends the run. Aborts by default.
    fn on_tool_failure(&self, _failure: &ToolFailure) -> FailureDecision {
        FailureDecision::Abort
    }
}
