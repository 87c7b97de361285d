//! End-to-end research runs with the stub search tool.

use serde_json::Value;
use sonar::{AgentRunError, FailureReason};
use sonar_testing::{AgentHarness, MockToolRegistry, ScriptedBackend, metrics_named};

const TOPIC: &str = "quantum computing";

#[tokio::test]
async fn quantum_computing_run_succeeds() {
    let harness = AgentHarness::builder()
        .backend(ScriptedBackend::single_tool("web_search", TOPIC))
        .build()
        .unwrap();

    let report = harness.agent().run(TOPIC).await.unwrap();
    assert!(report.answer.contains("Search results for: quantum computing"));
    assert_eq!(report.tool_calls, 1);
    assert_eq!(report.iterations, 2);

    let events = harness.events().unwrap();
    let searches: Vec<_> = events
        .iter()
        .filter(|e| e.event_type.as_str() == "search_executed")
        .collect();
    assert_eq!(searches.len(), 1);
    assert_eq!(
        searches[0].get("query"),
        Some(&Value::String(TOPIC.to_string()))
    );

    let latency = metrics_named(harness.log_path(), "execution_latency").unwrap();
    assert_eq!(latency.len(), 1);
    assert!(latency[0].value >= 0.0);

    let completed = events
        .iter()
        .find(|e| e.event_type.as_str() == "agent_completed")
        .unwrap();
    assert_eq!(
        completed.get("topic"),
        Some(&Value::String(TOPIC.to_string()))
    );
    assert_eq!(harness.count("agent_error").unwrap(), 0);
}

#[tokio::test]
async fn quantum_computing_run_fails_when_search_fails() {
    let tools = MockToolRegistry::new()
        .with_failing_search(FailureReason::Timeout {
            operation: "web search".to_string(),
        })
        .unwrap();
    let harness = AgentHarness::builder()
        .backend(ScriptedBackend::single_tool("web_search", TOPIC))
        .tools(tools)
        .build()
        .unwrap();

    let error = harness.agent().run(TOPIC).await.unwrap_err();
    assert!(matches!(error, AgentRunError::Tool(_)));
    assert_eq!(error.error_code(), "TOOL_FAILED");

    let events = harness.events().unwrap();
    let search_errors: Vec<_> = events
        .iter()
        .filter(|e| e.event_type.as_str() == "search_error")
        .collect();
    assert_eq!(search_errors.len(), 1);
    assert!(search_errors[0].get("error").is_some());
    assert_eq!(
        search_errors[0].get("query"),
        Some(&Value::String(TOPIC.to_string()))
    );

    assert_eq!(harness.count("agent_error").unwrap(), 1);
    assert_eq!(harness.count("agent_completed").unwrap(), 0);
    assert!(metrics_named(harness.log_path(), "token_usage")
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn agent_error_carries_the_failing_input() {
    let harness = AgentHarness::builder()
        .backend(ScriptedBackend::new().then_fail(503, "model overloaded"))
        .build()
        .unwrap();

    let error = harness.agent().run(TOPIC).await.unwrap_err();
    assert!(matches!(error, AgentRunError::Planning(_)));

    let events = harness.events().unwrap();
    let agent_error = events
        .iter()
        .find(|e| e.event_type.as_str() == "agent_error")
        .unwrap();
    assert_eq!(
        agent_error.get("input"),
        Some(&Value::String(TOPIC.to_string()))
    );
    assert!(
        agent_error
            .get("error")
            .and_then(Value::as_str)
            .unwrap()
            .contains("503")
    );
    assert!(agent_error.get("timestamp").is_some());
}
