//! OpenAI-compatible chat completions backend.
//!
//! Tools are offered as functions taking a single string argument `input`.
//! The conversation so far is replayed on every request: each [`Turn`]
//! becomes an assistant tool call followed by the tool's reply.

use crate::backend::{Action, ConversationState, ModelBackend, Observation, Usage};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Default timeout for model requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are a research assistant. Use the available tools to \
gather information about the topic, then reply with a concise answer.";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone, PartialEq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Backend for any endpoint speaking the chat completions API.
#[derive(Clone)]
pub struct OpenAiBackend {
    http: Client,
    config: OpenAiConfig,
    endpoint: String,
}

impl fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self, BackendError> {
        if config.api_key.trim().is_empty() {
            return Err(BackendError::Config("API key is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("sonar-agent/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn request_body(&self, state: &ConversationState) -> Value {
        let mut messages = vec![
            json!({"role": "system", "content": SYSTEM_PROMPT}),
            json!({
                "role": "user",
                "content": format!("Research the following topic: {}", state.topic),
            }),
        ];

        for (index, turn) in state.turns.iter().enumerate() {
            let call_id = format!("call_{index}");
            let arguments = json!({"input": turn.input}).to_string();
            messages.push(json!({
                "role": "assistant",
                "content": Value::Null,
                "tool_calls": [{
                    "id": call_id,
                    "type": "function",
                    "function": {"name": turn.tool, "arguments": arguments},
                }],
            }));
            let content = match &turn.observation {
                Observation::Output(output) => output.clone(),
                Observation::Error(error) => format!("Error: {error}"),
            };
            messages.push(json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": content,
            }));
        }

        let tools: Vec<Value> = state
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": {
                            "type": "object",
                            "properties": {"input": {"type": "string"}},
                            "required": ["input"],
                        },
                    },
                })
            })
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = Value::String("auto".to_string());
        }
        body
    }
}

/// Pull the `input` argument out of a function call, accepting raw text.
fn tool_input(arguments: &str) -> String {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => match map.get("input") {
            Some(Value::String(input)) => input.clone(),
            Some(other) => other.to_string(),
            None => arguments.to_string(),
        },
        Ok(Value::String(input)) => input,
        _ => arguments.to_string(),
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn plan_next_action(&self, state: &ConversationState) -> Result<Action, BackendError> {
        debug!(
            endpoint = %self.endpoint,
            model = %self.config.model,
            iteration = state.iteration,
            turns = state.turns.len(),
            "Requesting next action"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(state))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let usage = parsed.usage;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("response has no choices".to_string()))?;

        if let Some(call) = choice.message.tool_calls.into_iter().next() {
            return Ok(Action::UseTool {
                input: tool_input(&call.function.arguments),
                tool: call.function.name,
                usage,
            });
        }

        if let Some(refusal) = choice.message.refusal {
            return Err(BackendError::Refused(refusal));
        }
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(BackendError::Refused("content filtered".to_string()));
        }

        match choice.message.content {
            Some(answer) => Ok(Action::FinalAnswer { answer, usage }),
            None => Err(BackendError::Decode(
                "message has neither content nor tool calls".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ToolSpec;
    use sonar_core::AgentId;

    fn state() -> ConversationState {
        let mut state = ConversationState::new(
            AgentId::new_unchecked("research_agent"),
            "quantum computing",
            vec![ToolSpec {
                name: "web_search".into(),
                description: "Search the web".into(),
            }],
        );
        state.push_turn(
            "web_search",
            "quantum computing",
            Observation::Output("Search results for: quantum computing".into()),
        );
        state
    }

    #[test]
    fn request_replays_turns_as_tool_messages() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("sk-test")).unwrap();
        let body = backend.request_body(&state());

        assert_eq!(body["model"], "gpt-4-turbo");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "web_search");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_0");
        assert_eq!(body["tools"][0]["function"]["name"], "web_search");
    }

    #[test]
    fn tool_input_accepts_json_or_text() {
        assert_eq!(tool_input(r#"{"input": "rust"}"#), "rust");
        assert_eq!(tool_input(r#""rust""#), "rust");
        assert_eq!(tool_input("plain text"), "plain text");
        assert_eq!(tool_input(r#"{"query": "rust"}"#), r#"{"query": "rust"}"#);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            OpenAiBackend::new(OpenAiConfig::new("  ")),
            Err(BackendError::Config(_))
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", OpenAiConfig::new("sk-secret"));
        assert!(!rendered.contains("sk-secret"));
    }
}
