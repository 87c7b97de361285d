//! # Research Tools
//!
//! The two tools the research agent is built with. `web_search` is a stub
//! with no network access; `summarize` is deterministic.

use crate::registry::{InMemoryToolRegistry, ToolDescriptor};
use serde::{Deserialize, Serialize};
use sonar_core::{ExecutionResult, FailureReason, Tool, ToolError, ToolResult};
use std::sync::Arc;

/// Offline web search.
///
/// Returns `Search results for: {query}` for any non-blank query.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSearchTool;

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";
    /// Calls are logged as `search_executed` / `search_error`.
    pub const EVENT_PREFIX: &'static str = "search";

    pub fn new() -> Self {
        Self
    }
}

impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search the web for information about a query"
    }

    fn call(&self, input: String) -> ExecutionResult {
        let query = input.trim();
        if query.is_empty() {
            return ExecutionResult::failed(FailureReason::InvalidInput {
                message: "search query is empty".to_string(),
            });
        }
        ExecutionResult::success(format!("Search results for: {query}"))
    }
}

/// Input accepted by [`SummarizeTool`].
///
/// Either a JSON object of this shape or plain text.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizeConfig {
    pub text: String,
    #[serde(default)]
    pub max_sentences: Option<usize>,
}

impl SummarizeConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_sentences: None,
        }
    }

    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = Some(max_sentences);
        self
    }

    fn parse(input: String) -> Self {
        serde_json::from_str(&input).unwrap_or_else(|_| Self::new(input))
    }
}

/// Extractive summarizer: keeps the leading sentences, bounded in length.
#[derive(Debug, Clone, Copy)]
pub struct SummarizeTool {
    max_sentences: usize,
    max_chars: usize,
}

impl Default for SummarizeTool {
    fn default() -> Self {
        Self {
            max_sentences: 3,
            max_chars: 500,
        }
    }
}

impl SummarizeTool {
    pub const NAME: &'static str = "summarize";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences.max(1);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    fn summarize(&self, text: &str, max_sentences: usize) -> String {
        let mut sentences = Vec::new();
        let mut start = 0;
        for (index, c) in text.char_indices() {
            if matches!(c, '.' | '!' | '?') {
                let end = index + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }

        let summary = sentences
            .into_iter()
            .take(max_sentences)
            .collect::<Vec<_>>()
            .join(" ");

        if summary.chars().count() <= self.max_chars {
            return summary;
        }
        let mut truncated: String = summary.chars().take(self.max_chars).collect();
        truncated.push_str("...");
        truncated
    }
}

impl Tool for SummarizeTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Summarize a piece of text into its leading sentences"
    }

    fn call(&self, input: String) -> ExecutionResult {
        let config = SummarizeConfig::parse(input);
        if config.text.trim().is_empty() {
            return ExecutionResult::failed(FailureReason::InvalidInput {
                message: "nothing to summarize".to_string(),
            });
        }

        let max_sentences = config
            .max_sentences
            .unwrap_or(self.max_sentences)
            .max(1);
        ExecutionResult::success(self.summarize(&config.text, max_sentences))
    }
}

fn describe(tool: Arc<dyn Tool>) -> ToolResult<ToolDescriptor> {
    let name = tool.name().to_string();
    ToolDescriptor::new(tool).map_err(|validation_error| ToolError::InvalidToolId {
        attempted_name: name,
        validation_error,
    })
}

/// Registry holding `web_search` and `summarize`.
pub fn research_tools() -> ToolResult<InMemoryToolRegistry> {
    let search = describe(Arc::new(WebSearchTool::new()))?
        .with_event_prefix(WebSearchTool::EVENT_PREFIX);
    let summarize = describe(Arc::new(SummarizeTool::new()))?;

    Ok(InMemoryToolRegistry::new()
        .with_descriptor(search)
        .with_descriptor(summarize))
}
