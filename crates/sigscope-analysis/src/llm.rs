//! LLM completion contract and the Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sigscope_core::AppConfig;

use crate::error::AnalysisError;
use crate::retry::retry_with_backoff;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Base delay for the first retry of a transient LLM failure.
const BACKOFF_BASE_MS: u64 = 1_000;

/// A single-prompt text completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` as one user message and return the response text.
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl AnthropicConfig {
    /// Derive client settings from the application config.
    ///
    /// Returns `None` when no API key is configured.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let api_key = config.anthropic_api_key.clone()?;
        Some(Self {
            api_key,
            base_url: config.llm_base_url.clone(),
            model: config.llm_model.clone(),
            max_tokens: config.llm_max_tokens,
            timeout_secs: config.llm_timeout_secs,
            max_retries: config.llm_max_retries,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for the Anthropic Messages API.
///
/// Transient failures (timeouts, connection errors, 429, 5xx) are retried
/// with exponential back-off up to `max_retries` additional attempts.
pub struct AnthropicClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("url", &self.url)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: AnthropicConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            backoff_base_ms: BACKOFF_BASE_MS,
        })
    }

    /// Override the base back-off delay between retries.
    #[must_use]
    pub fn with_backoff_base_ms(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    async fn send_once(&self, prompt: &str) -> Result<String, AnalysisError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&response.text().await?)?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.send_once(prompt)
        })
        .await
    }
}
