#![allow(dead_code)]
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;

/// The finish reason the endpoint reports when generation was cut off by the
/// per-request output token ceiling rather than stopping naturally.
pub const TRUNCATED_FINISH_REASON: &str = "length";

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn in the conversation. An ordered `Vec<Message>` is the
/// conversation history, in chronological turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Token counters reported by the endpoint for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    // Prompt tokens consumed, including the full message history
    pub prompt_tokens: u64,

    // The tokens generated
    pub completion_tokens: u64,
}

/// One request/response cycle's output, normalized from the wire format.
/// Only the first choice of the response is represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

impl ChatCompletion {
    /// True when the endpoint stopped generating because it hit the output
    /// token ceiling; any other finish reason counts as a natural finish.
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some(TRUNCATED_FINISH_REASON)
    }
}

/// The slice of a chat-completion API that the assembler needs. Implemented
/// by `OpenAiClient` for real requests and by scripted fakes in tests.
#[async_trait]
pub trait ChatClient {
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<ChatCompletion>;
}

#[derive(Debug, Deserialize, Clone)]
struct Response {
    choices: Vec<Choice>,

    // Usage data is always returned for non-streaming requests.
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize, Clone)]
struct Choice {
    // Depends on the model. Ex: 'stop' | 'length' | 'content_filter' | 'tool_calls'
    finish_reason: Option<String>,
    message: ResponseMessage,
}

#[derive(Debug, Deserialize, Clone)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct ErrorResponse {
    message: String,

    // Contains additional error information such as provider details, the raw error message, etc.
    code: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Clone)]
struct ErrorResponseContainer {
    error: ErrorResponse,
}

/// `OpenAiClient` talks to an OpenAI compatible chat-completion endpoint.
///
/// Every request sends the full message history with a fixed temperature of
/// zero and the configured `max_tokens` ceiling, and the sole returned choice
/// is normalized into a `ChatCompletion`. This is a plain non-streaming
/// client; it carries no retry or timeout policy beyond what `reqwest`
/// enforces on its own.
pub struct OpenAiClient {
    client: Client,
    api: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Self {
        OpenAiClient {
            client: Client::new(),
            api: config.api.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<ChatCompletion> {
        let url = format!("{}/v1/chat/completions", self.api);

        // Temperature is pinned to zero so that every continuation request
        // samples deterministically from the same distribution.
        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": 0,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let error_message = format!(
                "API request failed with status {}: {}",
                response.status(),
                response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response body".to_string())
            );
            return Err(anyhow!(error_message));
        }

        let response_text = response.text().await?;
        parse_response(&response_text)
    }
}

/// Parses a non-streaming JSON response body into a `ChatCompletion`.
///
/// If the body does not parse as a successful response, it is retried as the
/// endpoint's error-container shape so API-level failures surface with their
/// own message rather than as a JSON parse error.
fn parse_response(response_text: &str) -> Result<ChatCompletion> {
    match serde_json::from_str::<Response>(response_text) {
        Ok(api_result) => {
            let choice = api_result
                .choices
                .into_iter()
                .next()
                .context("API response contained no choices")?;
            let usage = api_result
                .usage
                .context("API response contained no usage data")?;
            Ok(ChatCompletion {
                content: choice.message.content.unwrap_or_default(),
                finish_reason: choice.finish_reason,
                usage,
            })
        }
        Err(_) => match serde_json::from_str::<ErrorResponseContainer>(response_text) {
            Ok(error_container) => Err(anyhow!(
                "API request failed: {} (code: {:?})",
                error_container.error.message,
                error_container.error.code,
            )),
            Err(e) => Err(anyhow!(
                "Failed to parse JSON: {}\nRaw JSON: {}",
                e,
                response_text
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_truncated_response() {
        let body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1735000000,
            "model": "gpt-4o",
            "choices": [
                {
                    "index": 0,
                    "message": { "role": "assistant", "content": "Part A" },
                    "finish_reason": "length"
                }
            ],
            "usage": { "prompt_tokens": 10, "completion_tokens": 1000, "total_tokens": 1010 }
        }"#;

        let completion = parse_response(body).unwrap();
        assert!(completion.truncated());
        assert_eq!(completion.content, "Part A");
        assert_eq!(
            completion.usage,
            Usage {
                prompt_tokens: 10,
                completion_tokens: 1000
            }
        );
    }

    #[test]
    fn natural_stop_is_not_truncated() {
        let body = r#"{
            "choices": [
                {
                    "message": { "role": "assistant", "content": "Part B" },
                    "finish_reason": "stop"
                }
            ],
            "usage": { "prompt_tokens": 1200, "completion_tokens": 50, "total_tokens": 1250 }
        }"#;

        let completion = parse_response(body).unwrap();
        assert!(!completion.truncated());
        assert_eq!(completion.content, "Part B");
    }

    #[test]
    fn error_container_surfaces_api_message() {
        let body = r#"{
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        }"#;

        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[test]
    fn response_without_choices_is_an_error() {
        let body = r#"{
            "choices": [],
            "usage": { "prompt_tokens": 1, "completion_tokens": 0, "total_tokens": 1 }
        }"#;

        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let message = Message::assistant("partial");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "partial");
    }
}
