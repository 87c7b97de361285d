use crate::backend::{Action, ConversationState, ModelBackend};
use crate::error::BackendError;
use async_trait::async_trait;

const SEARCH_TOOL: &str = "web_search";
const SUMMARIZE_TOOL: &str = "summarize";

/// Offline planner with a fixed script: search the topic, summarize the
/// results, answer with the summary.
///
/// Steps whose tool is not registered are skipped. Reports no token usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordBackend;

impl KeywordBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelBackend for KeywordBackend {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn plan_next_action(&self, state: &ConversationState) -> Result<Action, BackendError> {
        if state.has_tool(SEARCH_TOOL) && !state.has_used(SEARCH_TOOL) {
            return Ok(Action::UseTool {
                tool: SEARCH_TOOL.to_string(),
                input: state.topic.clone(),
                usage: None,
            });
        }

        let last_output = state
            .last_turn()
            .filter(|turn| !turn.observation.is_error())
            .map(|turn| turn.observation.text().to_string());

        if let Some(output) = &last_output
            && state.has_tool(SUMMARIZE_TOOL)
            && !state.has_used(SUMMARIZE_TOOL)
        {
            return Ok(Action::UseTool {
                tool: SUMMARIZE_TOOL.to_string(),
                input: output.clone(),
                usage: None,
            });
        }

        let answer = match last_output {
            Some(findings) => format!("Research on '{}': {findings}", state.topic),
            None => format!("No findings for '{}'", state.topic),
        };
        Ok(Action::FinalAnswer {
            answer,
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Observation, ToolSpec};
    use sonar_core::AgentId;

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn follows_search_summarize_answer() {
        let backend = KeywordBackend::new();
        let mut state = ConversationState::new(
            AgentId::new_unchecked("research_agent"),
            "rust",
            vec![spec("web_search"), spec("summarize")],
        );

        let first = backend.plan_next_action(&state).await.unwrap();
        assert_eq!(
            first,
            Action::UseTool {
                tool: "web_search".into(),
                input: "rust".into(),
                usage: None
            }
        );
        state.push_turn(
            "web_search",
            "rust",
            Observation::Output("Search results for: rust".into()),
        );

        let second = backend.plan_next_action(&state).await.unwrap();
        assert!(matches!(second, Action::UseTool { ref tool, .. } if tool == "summarize"));
        state.push_turn(
            "summarize",
            "Search results for: rust",
            Observation::Output("Search results for: rust".into()),
        );

        let third = backend.plan_next_action(&state).await.unwrap();
        assert_eq!(
            third,
            Action::FinalAnswer {
                answer: "Research on 'rust': Search results for: rust".into(),
                usage: None
            }
        );
    }

    #[tokio::test]
    async fn answers_directly_without_tools() {
        let state =
            ConversationState::new(AgentId::new_unchecked("research_agent"), "rust", vec![]);
        let action = KeywordBackend.plan_next_action(&state).await.unwrap();
        assert!(matches!(action, Action::FinalAnswer { .. }));
    }
}
