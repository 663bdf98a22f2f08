//! Chat model client
//!
//! Every language-model call in JobHunter goes through the [`ChatModel`]
//! trait. [`OpenAiClient`] implements it against an OpenAI-compatible
//! chat-completions endpoint with retry on rate limits and server errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default chat-completions API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model: cheap and good enough for extraction and rewriting
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Requested output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the model for a single JSON object
    JsonObject,
}

/// A single-turn chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub user: String,
    pub format: ResponseFormat,
}

impl ChatRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            format: ResponseFormat::Text,
        }
    }

    /// Set the system instruction
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Request JSON-object output
    pub fn json(mut self) -> Self {
        self.format = ResponseFormat::JsonObject;
        self
    }
}

/// A language model that answers one chat request with text
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the trimmed text of the first choice
    ///
    /// Empty or missing content is [`LlmError::EmptyContent`].
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<FormatSpec>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct FormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// OpenAI-compatible chat-completions client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry_delay: Duration,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Base delay for exponential backoff between retries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body<'a>(&'a self, request: &'a ChatRequest) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.user,
        });

        CompletionRequest {
            model: &self.model,
            messages,
            response_format: match request.format {
                ResponseFormat::Text => None,
                ResponseFormat::JsonObject => Some(FormatSpec {
                    kind: "json_object",
                }),
            },
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    /// Retries on 429 and 5xx, doubling the base delay after each failure
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = self.request_body(request);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_delay * (1 << (attempt - 1));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "LLM call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), body = %text, "LLM API returned retryable status");
                last_error = Some(if status.as_u16() == 429 {
                    LlmError::RateLimited {
                        retries: MAX_RETRIES,
                    }
                } else {
                    LlmError::Api {
                        status: status.as_u16(),
                        message: text,
                    }
                });
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let completion: CompletionResponse = response.json().await?;

            if let Some(usage) = &completion.usage {
                debug!(
                    model = %self.model,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "LLM call succeeded"
                );
            }

            return completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .ok_or(LlmError::EmptyContent);
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }
}
