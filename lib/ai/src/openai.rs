//! OpenAI-compatible completion backend.
//!
//! Speaks the `/v1/chat/completions` schema used by OpenAI, Ollama,
//! LM Studio, and most local inference servers. One bounded-wait request per
//! invocation; no retries.

use crate::backend::{ChatMessage, Completion, CompletionBackend, LlmBackendConfig, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An OpenAI-compatible chat completion backend.
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
    completions_url: String,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the configuration is unusable
    /// or the HTTP client cannot be constructed.
    pub fn new(config: LlmBackendConfig) -> Result<Self, LlmError> {
        if config.base_url.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "base_url must not be empty".to_string(),
            });
        }
        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "model must not be empty".to_string(),
            });
        }

        let completions_url = format!(
            "{}/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            config,
            completions_url,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            endpoint = %self.completions_url,
            model = %self.config.model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let mut request = self.client.post(&self.completions_url).json(&body);

        if let Some(api_key) = &self.config.api_key
            && !api_key.is_empty()
        {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    endpoint: self.completions_url.clone(),
                }
            } else {
                LlmError::ProviderUnavailable {
                    endpoint: self.completions_url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                endpoint = %self.completions_url,
                status = %status,
                body = %body,
                "Chat completion endpoint returned error"
            );
            return Err(LlmError::RequestFailed {
                status: status.as_u16(),
                reason: body,
            });
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        completion_from_response(parsed)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Extracts the single completion from a decoded response.
///
/// A response that decodes but carries no usable text (no choices, or a
/// non-text content payload) is a malformed completion, not an answer.
fn completion_from_response(response: ChatCompletionResponse) -> Result<Completion, LlmError> {
    let model = response.model.unwrap_or_default();
    let usage = response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let first = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedCompletion {
            reason: "response contained no choices".to_string(),
        })?;

    let content = first
        .message
        .content
        .ok_or_else(|| LlmError::MalformedCompletion {
            reason: "completion message carried no text content".to_string(),
        })?;

    Ok(Completion {
        content,
        model,
        usage,
    })
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<UsagePayload>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsagePayload {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
