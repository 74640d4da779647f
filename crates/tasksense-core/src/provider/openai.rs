//! Client for OpenAI-compatible chat-completion APIs.
//!
//! One request shape serves all three hosted backends; only the prompts
//! and the sampling settings differ.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::AiConfig;
use crate::error::{AiError, AiResult, Operation};

/// Chat-completion client bound to one key, endpoint and model.
#[derive(Clone)]
pub struct ChatClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

/// Text and token usage of one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub text: String,
    pub total_tokens: i64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: i64,
}

impl ChatClient {
    /// Build a client from configuration. A missing key is a configuration
    /// error attributed to `operation`.
    pub fn from_config(config: &AiConfig, operation: Operation) -> AiResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AiError::Configuration(format!("OpenAI API key is required for {}", operation))
            })?;

        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system + user exchange and return the trimmed reply.
    pub async fn complete(
        &self,
        operation: Operation,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> AiResult<ChatCompletion> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            temperature,
        };

        debug!(model = %self.model, operation = %operation, "calling chat completions API");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(operation = %operation, status = %status, "chat completions API error");
            return Err(AiError::provider(
                operation,
                format!("API error (HTTP {}): {}", status, body),
            ));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AiError::provider(operation, "AI returned empty response"))?;

        let total_tokens = body.usage.map(|u| u.total_tokens).unwrap_or(0);
        debug!(operation = %operation, tokens = total_tokens, "chat completion received");

        Ok(ChatCompletion { text, total_tokens })
    }

    fn transport_error(&self, operation: Operation, err: reqwest::Error) -> AiError {
        if err.is_timeout() {
            return AiError::Timeout {
                operation,
                seconds: self.timeout.as_secs(),
            };
        }
        error!(operation = %operation, error = %err, "chat completions request failed");
        AiError::provider(operation, format!("request failed: {}", err))
    }
}

/// Extract a JSON object from model output that may wrap it in markdown
/// fences or prose.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_marker = &trimmed[start + 7..];
        if let Some(end) = after_marker.find("```") {
            return after_marker[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_marker = &trimmed[start + 3..];
        if let Some(end) = after_marker.find("```") {
            return after_marker[..end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

/// Parse model output as a JSON object, attributing failures to `operation`.
pub fn parse_json_object(
    operation: Operation,
    text: &str,
) -> AiResult<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(extract_json(text)) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AiError::provider(operation, "AI response is not a JSON object")),
        Err(e) => {
            error!(operation = %operation, "failed to parse AI response as JSON");
            Err(AiError::provider(
                operation,
                format!("Invalid JSON response from AI: {}", e),
            ))
        }
    }
}
