//! Validated identifier types
//!
//! Newtypes used across Sonar so that a tool name can never be passed where
//! an agent name or a trace id is expected. `AgentId` and `ToolId` are
//! parsed from strings and validated with [`IdValidator`]; `TraceId` is
//! always generated (UUID v4) and never parsed from user input except when
//! reading logs back.
//!
//! ```rust
//! use sonar_core::identifiers::{AgentId, ToolId, TraceId};
//!
//! let agent = AgentId::parse("research_agent").unwrap();
//! let tool = ToolId::parse("web_search").unwrap();
//! let trace = TraceId::generate();
//!
//! assert_eq!(agent.as_str(), "research_agent");
//! assert_eq!(tool.to_string(), "web_search");
//! assert_ne!(trace, TraceId::generate());
//! ```

mod validation;

pub use validation::{IdValidationError, IdValidator, MAX_ID_LENGTH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of an agent, used as the `agent` tag on every event it emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Parse and validate an agent ID from a string
    pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        IdValidator::validate(id.as_ref()).map(|s| Self(s.to_string()))
    }

    /// Get the agent ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create an agent ID without validation (for testing only)
    #[doc(hidden)]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl TryFrom<String> for AgentId {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

/// Name of a registered tool.
///
/// The registry is keyed by `ToolId`, and the model backend's tool selection
/// is parsed into one before lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolId(String);

impl ToolId {
    /// Parse and validate a tool ID from a string
    pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        IdValidator::validate(id.as_ref()).map(|s| Self(s.to_string()))
    }

    /// Get the tool ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a tool ID without validation (for testing only)
    #[doc(hidden)]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ToolId {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ToolId> for String {
    fn from(id: ToolId) -> Self {
        id.0
    }
}

impl TryFrom<String> for ToolId {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

/// Unique identifier of one unit of work (an agent run or a tool call).
///
/// Metrics hold a `TraceId` as a plain back-reference; it never grants access
/// to the live trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(uuid::Uuid);

impl TraceId {
    /// Generate a new random trace ID using UUID v4
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a trace ID previously rendered with `to_string`
    pub fn parse(id: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(id).map(Self)
    }

    /// Borrow the underlying UUID
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
