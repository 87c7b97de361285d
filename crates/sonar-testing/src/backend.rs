//! # Scripted Model Backend
//!
//! Plays back a fixed sequence of planning steps so agent runs are fully
//! deterministic.

use async_trait::async_trait;
use sonar_agent::{
    Action, BackendError, ConversationState, FailureDecision, ModelBackend, ToolFailure, Usage,
};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
enum Step {
    Act(Action),
    Fail { status: u16, body: String },
}

/// Backend that answers from a script.
///
/// Once the script is exhausted it keeps repeating its `repeat` action if
/// one is set, otherwise it answers with the fallback answer.
#[derive(Debug)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Step>>,
    repeat: Option<Action>,
    fallback_answer: String,
    decision: FailureDecision,
    seen: Mutex<Vec<ConversationState>>,
    failures: Mutex<Vec<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            fallback_answer: "done".to_string(),
            decision: FailureDecision::Abort,
            seen: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `tool` with `input`, then answer with the last observation.
    pub fn single_tool(tool: &str, input: &str) -> Self {
        Self::new().then_use_tool(tool, input)
    }

    /// Keep calling `tool` forever. Useful for exercising the planning cap.
    pub fn looping(tool: &str, input: &str) -> Self {
        Self {
            repeat: Some(Action::UseTool {
                tool: tool.to_string(),
                input: input.to_string(),
                usage: None,
            }),
            ..Self::default()
        }
    }

    pub fn then_use_tool(self, tool: &str, input: &str) -> Self {
        self.then(Action::UseTool {
            tool: tool.to_string(),
            input: input.to_string(),
            usage: None,
        })
    }

    pub fn then_answer(self, answer: &str, total_tokens: u64) -> Self {
        self.then(Action::FinalAnswer {
            answer: answer.to_string(),
            usage: Some(Usage {
                prompt_tokens: total_tokens,
                completion_tokens: 0,
                total_tokens,
            }),
        })
    }

    pub fn then(self, action: Action) -> Self {
        lock(&self.script).push_back(Step::Act(action));
        self
    }

    /// Make the next planning step fail with an HTTP status.
    pub fn then_fail(self, status: u16, body: &str) -> Self {
        lock(&self.script).push_back(Step::Fail {
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn with_failure_decision(mut self, decision: FailureDecision) -> Self {
        self.decision = decision;
        self
    }

    pub fn with_fallback_answer(mut self, answer: impl Into<String>) -> Self {
        self.fallback_answer = answer.into();
        self
    }

    /// Number of planning requests served so far
    pub fn plan_calls(&self) -> usize {
        lock(&self.seen).len()
    }

    /// Conversation states seen, in order
    pub fn seen_states(&self) -> Vec<ConversationState> {
        lock(&self.seen).clone()
    }

    /// Tool failures the agent reported, rendered
    pub fn reported_failures(&self) -> Vec<String> {
        lock(&self.failures).clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn plan_next_action(&self, state: &ConversationState) -> Result<Action, BackendError> {
        lock(&self.seen).push(state.clone());

        let last_output = state
            .last_turn()
            .map(|turn| turn.observation.text().to_string());

        match lock(&self.script).pop_front() {
            Some(Step::Act(action)) => Ok(action),
            Some(Step::Fail { status, body }) => Err(BackendError::Status { status, body }),
            None => match &self.repeat {
                Some(action) => Ok(action.clone()),
                None => Ok(Action::FinalAnswer {
                    answer: last_output.unwrap_or_else(|| self.fallback_answer.clone()),
                    usage: None,
                }),
            },
        }
    }

    fn on_tool_failure(&self, failure: &ToolFailure) -> FailureDecision {
        lock(&self.failures).push(failure.to_string());
        self.decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_core::AgentId;

    fn state() -> ConversationState {
        ConversationState::new(AgentId::new_unchecked("research_agent"), "rust", vec![])
    }

    #[tokio::test]
    async fn plays_script_then_falls_back() {
        let backend = ScriptedBackend::single_tool("web_search", "rust");

        let first = backend.plan_next_action(&state()).await.unwrap();
        assert!(matches!(first, Action::UseTool { ref tool, .. } if tool == "web_search"));

        let second = backend.plan_next_action(&state()).await.unwrap();
        assert_eq!(
            second,
            Action::FinalAnswer {
                answer: "done".into(),
                usage: None
            }
        );
        assert_eq!(backend.plan_calls(), 2);
    }

    #[tokio::test]
    async fn scripted_failure_surfaces() {
        let backend = ScriptedBackend::new().then_fail(503, "overloaded");
        let error = backend.plan_next_action(&state()).await.unwrap_err();
        assert!(matches!(error, BackendError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn looping_never_answers() {
        let backend = ScriptedBackend::looping("web_search", "rust");
        for _ in 0..5 {
            let action = backend.plan_next_action(&state()).await.unwrap();
            assert!(matches!(action, Action::UseTool { .. }));
        }
    }
}
