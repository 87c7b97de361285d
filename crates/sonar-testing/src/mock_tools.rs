//! # Mock Tools for Testing
//!
//! Tool implementations with predictable responses and call tracking, plus a
//! registry that keeps handles to them for inspection after a run.

use sonar_core::{ExecutionResult, FailureReason, Tool, ToolCall, ToolId, ToolResult};
use sonar_tools::{InMemoryToolRegistry, ToolDescriptor, ToolRegistry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A mock tool that returns predefined responses based on input
#[derive(Debug, Clone)]
pub struct MockTool {
    name: String,
    description: String,
    responses: HashMap<String, ExecutionResult>,
    default_response: Option<ExecutionResult>,
    formatter: Option<fn(&str) -> String>,
    call_count: Arc<Mutex<usize>>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockTool {
    /// Create a new mock tool with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "Mock tool".to_string(),
            responses: HashMap::new(),
            default_response: None,
            formatter: None,
            call_count: Arc::new(Mutex::new(0)),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Stand-in for `web_search` that answers `Search results for: {query}`
    pub fn search_stub() -> Self {
        Self::new("web_search")
            .with_description("Search the web for information about a query")
            .responding_with(|query| format!("Search results for: {query}"))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a response for a specific input
    pub fn with_response(mut self, input: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .insert(input.into(), ExecutionResult::success(response.into()));
        self
    }

    /// Add a failure response for a specific input
    pub fn with_failure(mut self, input: impl Into<String>, reason: FailureReason) -> Self {
        self.responses
            .insert(input.into(), ExecutionResult::failed(reason));
        self
    }

    /// Set a default response for any unmatched input
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(ExecutionResult::success(response.into()));
        self
    }

    /// Set a default failure for any unmatched input
    pub fn with_default_failure(mut self, reason: FailureReason) -> Self {
        self.default_response = Some(ExecutionResult::failed(reason));
        self
    }

    /// Build the output for unmatched input from the input itself
    pub fn responding_with(mut self, formatter: fn(&str) -> String) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Get the number of times this tool has been called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Get the history of inputs passed to this tool
    pub fn call_history(&self) -> Vec<String> {
        lock(&self.call_history).clone()
    }

    /// Reset call count and history
    pub fn reset(&self) {
        *lock(&self.call_count) = 0;
        lock(&self.call_history).clear();
    }

    /// Check if the tool was called with a specific input
    pub fn was_called_with(&self, input: &str) -> bool {
        lock(&self.call_history).iter().any(|seen| seen == input)
    }
}

impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn call(&self, input: String) -> ExecutionResult {
        *lock(&self.call_count) += 1;
        lock(&self.call_history).push(input.clone());

        if let Some(response) = self.responses.get(&input) {
            response.clone()
        } else if let Some(default) = &self.default_response {
            default.clone()
        } else if let Some(formatter) = self.formatter {
            ExecutionResult::success(formatter(&input))
        } else {
            ExecutionResult::success(format!("Mock response for: {input}"))
        }
    }
}

/// A registry of mock tools that keeps handles for inspection
#[derive(Debug, Clone, Default)]
pub struct MockToolRegistry {
    registry: InMemoryToolRegistry,
    mocks: HashMap<ToolId, Arc<MockTool>>,
}

impl MockToolRegistry {
    /// Create a new empty mock tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mock tool under its own name
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidToolId` if the mock's name is not a valid
    /// tool id.
    pub fn with_tool(self, tool: MockTool) -> ToolResult<Self> {
        self.with_prefixed_tool(tool, None)
    }

    /// Register a mock tool whose events use `prefix` instead of its name
    pub fn with_tool_prefix(self, tool: MockTool, prefix: &str) -> ToolResult<Self> {
        self.with_prefixed_tool(tool, Some(prefix))
    }

    /// Register [`MockTool::search_stub`] with the `search` event prefix
    pub fn with_search_stub(self) -> ToolResult<Self> {
        self.with_tool_prefix(MockTool::search_stub(), "search")
    }

    /// Register a `web_search` mock that always fails with `reason`
    pub fn with_failing_search(self, reason: FailureReason) -> ToolResult<Self> {
        let tool = MockTool::new("web_search").with_default_failure(reason);
        self.with_tool_prefix(tool, "search")
    }

    fn with_prefixed_tool(mut self, tool: MockTool, prefix: Option<&str>) -> ToolResult<Self> {
        let tool = Arc::new(tool);
        let mut descriptor = ToolDescriptor::new(tool.clone())?;
        if let Some(prefix) = prefix {
            descriptor = descriptor.with_event_prefix(prefix);
        }
        self.mocks.insert(descriptor.name().clone(), tool);
        self.registry = self.registry.with_descriptor(descriptor);
        Ok(self)
    }

    /// Get a handle to a registered mock
    pub fn get_mock_tool(&self, name: &str) -> Option<Arc<MockTool>> {
        let id = ToolId::parse(name).ok()?;
        self.mocks.get(&id).cloned()
    }

    /// Reset all mock tools' call tracking
    pub fn reset_all(&self) {
        for tool in self.mocks.values() {
            tool.reset();
        }
    }
}

impl ToolRegistry for MockToolRegistry {
    fn descriptor(&self, name: &ToolId) -> Option<&ToolDescriptor> {
        self.registry.descriptor(name)
    }

    fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.registry.descriptors()
    }

    fn invoke(&self, call: &ToolCall) -> ToolResult<ExecutionResult> {
        self.registry.invoke(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_tool_tracks_calls() {
        let tool = MockTool::new("echo").with_response("ping", "pong");

        assert_eq!(tool.call("ping".into()).output(), "pong");
        assert_eq!(tool.call("other".into()).output(), "Mock response for: other");
        assert_eq!(tool.call_count(), 2);
        assert!(tool.was_called_with("ping"));

        tool.reset();
        assert_eq!(tool.call_count(), 0);
        assert!(tool.call_history().is_empty());
    }

    #[test]
    fn search_stub_matches_real_output() {
        let tool = MockTool::search_stub();
        assert_eq!(
            tool.call("quantum computing".into()).output(),
            "Search results for: quantum computing"
        );
    }

    #[test]
    fn registry_shares_handles_with_dispatch() {
        let registry = MockToolRegistry::new().with_search_stub().unwrap();
        let call = ToolCall::new("web_search", "rust").unwrap();

        registry.invoke(&call).unwrap();

        let mock = registry.get_mock_tool("web_search").unwrap();
        assert_eq!(mock.call_count(), 1);
        assert_eq!(
            registry
                .descriptor(&call.tool)
                .map(|d| d.event_prefix().to_string()),
            Some("search".to_string())
        );
    }

    #[test]
    fn failing_search_reports_reason() {
        let registry = MockToolRegistry::new()
            .with_failing_search(FailureReason::NetworkError {
                message: "offline".into(),
            })
            .unwrap();
        let call = ToolCall::new("web_search", "rust").unwrap();
        let result = registry.invoke(&call).unwrap();
        assert!(result.is_failure());
    }

    #[test]
    fn invalid_mock_name_is_rejected() {
        assert!(MockToolRegistry::new().with_tool(MockTool::new("bad name")).is_err());
    }
}
