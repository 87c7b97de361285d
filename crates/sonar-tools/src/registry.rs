use sonar_core::{ExecutionResult, IdValidationError, Tool, ToolCall, ToolError, ToolId, ToolResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered tool: its name, description, handler and event label.
///
/// `event_prefix` names the events logged for calls to this tool:
/// `{prefix}_executed` on success and `{prefix}_error` on failure.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: ToolId,
    description: String,
    handler: Arc<dyn Tool>,
    event_prefix: String,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("event_prefix", &self.event_prefix)
            .finish()
    }
}

impl ToolDescriptor {
    /// Describe a handler under its own name.
    ///
    /// Description comes from the handler; the event prefix defaults to the
    /// tool name.
    pub fn new(handler: Arc<dyn Tool>) -> Result<Self, IdValidationError> {
        let name = ToolId::parse(handler.name())?;
        Ok(Self::with_name(name, handler))
    }

    /// Describe a handler under an already validated name.
    pub fn with_name(name: ToolId, handler: Arc<dyn Tool>) -> Self {
        Self {
            description: handler.description().to_string(),
            event_prefix: name.as_str().to_string(),
            name,
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = prefix.into();
        self
    }

    pub fn name(&self) -> &ToolId {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn event_prefix(&self) -> &str {
        &self.event_prefix
    }

    pub fn handler(&self) -> &Arc<dyn Tool> {
        &self.handler
    }
}

/// Trait for looking up and invoking tools.
///
/// Registries are read-only once built and are shared between concurrent
/// runs behind an `Arc`.
pub trait ToolRegistry: Send + Sync {
    /// Look up a registered tool.
    fn descriptor(&self, name: &ToolId) -> Option<&ToolDescriptor>;

    /// Every registered tool, ordered by name.
    fn descriptors(&self) -> Vec<&ToolDescriptor>;

    /// Invoke the tool named by `call`.
    ///
    /// # Returns
    ///
    /// `Err(ToolError::NotFound)` if no such tool is registered. Otherwise
    /// the handler's `ExecutionResult` exactly as returned, including
    /// failures.
    fn invoke(&self, call: &ToolCall) -> ToolResult<ExecutionResult> {
        let descriptor = self
            .descriptor(&call.tool)
            .ok_or_else(|| ToolError::not_found(call.tool.clone()))?;

        tracing::debug!(tool = %call.tool, "Invoking tool");
        Ok(descriptor.handler().call(call.input.clone()))
    }

    /// Names of every registered tool, ordered.
    fn tool_names(&self) -> Vec<ToolId> {
        self.descriptors()
            .into_iter()
            .map(|d| d.name().clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.descriptors().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory tool registry for local tool storage and dispatch.
///
/// # Example
///
/// ```rust
/// use sonar_tools::{InMemoryToolRegistry, ToolRegistry};
/// use sonar_core::{ExecutionResult, Tool, ToolCall};
/// use std::sync::Arc;
///
/// struct EchoTool;
///
/// impl Tool for EchoTool {
///     fn name(&self) -> &str { "echo" }
///     fn call(&self, input: String) -> ExecutionResult {
///         ExecutionResult::success(input)
///     }
/// }
///
/// let registry = InMemoryToolRegistry::new()
///     .try_with_tool(Arc::new(EchoTool))
///     .unwrap();
///
/// let call = ToolCall::new("echo", "hello").unwrap();
/// assert_eq!(registry.invoke(&call).unwrap().output(), "hello");
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryToolRegistry {
    tools: BTreeMap<ToolId, ToolDescriptor>,
}

impl InMemoryToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under a validated name.
    pub fn with_tool(self, name: ToolId, tool: Arc<dyn Tool>) -> Self {
        self.with_descriptor(ToolDescriptor::with_name(name, tool))
    }

    /// Register a tool under its own name, validating it.
    ///
    /// # Returns
    ///
    /// `Err(ToolError::InvalidToolId)` if the tool reports an invalid name
    pub fn try_with_tool(self, tool: Arc<dyn Tool>) -> ToolResult<Self> {
        let name = tool.name().to_string();
        let descriptor =
            ToolDescriptor::new(tool).map_err(|validation_error| ToolError::InvalidToolId {
                attempted_name: name,
                validation_error,
            })?;
        Ok(self.with_descriptor(descriptor))
    }

    /// Register a fully described tool. A tool with the same name is replaced.
    pub fn with_descriptor(mut self, descriptor: ToolDescriptor) -> Self {
        self.tools.insert(descriptor.name().clone(), descriptor);
        self
    }
}

impl ToolRegistry for InMemoryToolRegistry {
    fn descriptor(&self, name: &ToolId) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().collect()
    }

    fn len(&self) -> usize {
        self.tools.len()
    }
}
