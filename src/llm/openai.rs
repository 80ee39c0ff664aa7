//! OpenAI-compatible Chat Completions provider.
//!
//! Works with any server that speaks `/chat/completions` with bearer API key
//! authentication. The prompt is sent as a single user message.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::LlmProvider;

const PROVIDER: &str = "openai";

/// Chat Completions API provider.
pub struct OpenAiCompatProvider {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCompatProvider {
    /// Create a provider from configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let url = self.api_url("chat/completions");

        tracing::debug!("Sending request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Chat completions request failed: {}", e);
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        tracing::debug!("Chat completions response status: {}", status);

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("JSON parse error: {}. Raw: {}", e, response_text),
        })
    }
}

fn status_error(status: u16, body: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        429 => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after: None,
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("HTTP {}: {}", status, body),
        },
    }
}

fn first_choice_text(response: ChatCompletionResponse) -> Result<String, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "No choices in response".to_string(),
        })?;

    if choice.finish_reason.as_deref() == Some("length") {
        tracing::warn!("Model reply was cut off by the token limit");
    }

    Ok(choice.message.and_then(|m| m.content).unwrap_or_default())
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn predict(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatCompletionMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            temperature: Some(self.config.temperature),
        };

        let response = self.send_request(&request).await?;
        first_choice_text(response)
    }
}

// OpenAI-compatible Chat Completions API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatCompletionMessage>,
    finish_reason: Option<String>,
}
