//! # Agent Test Harness
//!
//! Wires a [`ResearchAgent`] to a temporary log, a mock tool registry and a
//! scripted backend, so a test only states what differs.

use crate::backend::ScriptedBackend;
use crate::logs::{self, TraceLedger};
use crate::mock_tools::MockToolRegistry;
use sonar_agent::{AgentProfile, ModelBackend, ResearchAgent};
use sonar_core::ToolError;
use sonar_observability::{
    NoopExporter, RemoteExporter, StructuredEvent, TelemetryError, TelemetryResult, TelemetrySink,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Setup failures while assembling a harness
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Failed to create temporary log directory: {0}")]
    TempDir(#[from] std::io::Error),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Tools(#[from] ToolError),
}

/// A ready-to-run agent over a throwaway log directory.
pub struct AgentHarness {
    dir: TempDir,
    agent: ResearchAgent,
    tools: MockToolRegistry,
}

impl std::fmt::Debug for AgentHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHarness")
            .field("dir", &self.dir.path())
            .field("agent", &self.agent)
            .finish()
    }
}

impl AgentHarness {
    pub fn builder() -> AgentHarnessBuilder {
        AgentHarnessBuilder::default()
    }

    pub fn agent(&self) -> &ResearchAgent {
        &self.agent
    }

    pub fn tools(&self) -> &MockToolRegistry {
        &self.tools
    }

    pub fn sink(&self) -> &TelemetrySink {
        self.agent.sink()
    }

    pub fn log_path(&self) -> &Path {
        self.agent.sink().log_path()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn events(&self) -> TelemetryResult<Vec<StructuredEvent>> {
        logs::events(self.log_path())
    }

    pub fn count(&self, event_name: &str) -> TelemetryResult<usize> {
        logs::count_events(self.log_path(), event_name)
    }

    pub fn ledger(&self) -> TelemetryResult<TraceLedger> {
        TraceLedger::from_path(self.log_path())
    }
}

/// Builder for [`AgentHarness`]
pub struct AgentHarnessBuilder {
    profile: AgentProfile,
    backend: Arc<dyn ModelBackend>,
    tools: Option<MockToolRegistry>,
    exporter: Arc<dyn RemoteExporter>,
    remote_timeout: Duration,
}

impl Default for AgentHarnessBuilder {
    fn default() -> Self {
        Self {
            profile: AgentProfile::default(),
            backend: Arc::new(ScriptedBackend::new()),
            tools: None,
            exporter: Arc::new(NoopExporter),
            remote_timeout: Duration::from_millis(200),
        }
    }
}

impl AgentHarnessBuilder {
    pub fn profile(mut self, profile: AgentProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.profile = self.profile.with_max_iterations(max_iterations);
        self
    }

    pub fn backend(mut self, backend: impl ModelBackend + 'static) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn shared_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Tools to register. Defaults to the `web_search` stub alone.
    pub fn tools(mut self, tools: MockToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn exporter(mut self, exporter: impl RemoteExporter + 'static) -> Self {
        self.exporter = Arc::new(exporter);
        self
    }

    pub fn shared_exporter(mut self, exporter: Arc<dyn RemoteExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Create the temporary log directory and assemble the agent.
    pub fn build(self) -> Result<AgentHarness, HarnessError> {
        let dir = tempfile::tempdir()?;
        let tools = match self.tools {
            Some(tools) => tools,
            None => MockToolRegistry::new().with_search_stub()?,
        };

        let sink = TelemetrySink::builder(dir.path().join("agent_logs.json"))
            .shared_exporter(self.exporter)
            .remote_timeout(self.remote_timeout)
            .environment("test")
            .build()?;

        let agent = ResearchAgent::new(
            self.profile,
            self.backend,
            Arc::new(tools.clone()),
            sink,
        );

        Ok(AgentHarness { dir, agent, tools })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_harness_runs_search_then_answers() {
        let harness = AgentHarness::builder()
            .backend(ScriptedBackend::single_tool("web_search", "rust"))
            .build()
            .unwrap();

        let report = harness.agent().run("rust").await.unwrap();
        assert_eq!(report.answer, "Search results for: rust");
        assert_eq!(harness.count("search_executed").unwrap(), 1);
        assert!(harness.ledger().unwrap().is_balanced());

        let search = harness.tools().get_mock_tool("web_search").unwrap();
        assert_eq!(search.call_history(), vec!["rust".to_string()]);
    }
}
