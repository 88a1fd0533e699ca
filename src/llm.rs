//! Completion service boundary
//!
//! Every LLM-delegated decision in the system (classification, reply
//! generation, recommendation, report) goes through the [`CompletionService`]
//! trait, which allows dependency injection of mock services in tests.
//!
//! The production implementation talks to an OpenAI-compatible
//! `/chat/completions` endpoint. Calls are not retried: a failure is
//! reported to the caller, which degrades to a fallback label or a fixed
//! user-safe message (greater availability is the deployment's concern,
//! not this client's).

use crate::config::LlmConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Single operation every LLM collaborator is reduced to
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one chat completion and return the assistant text
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> AppResult<String>;
}

/// One message in the chat-completions wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Production completion client for OpenAI-compatible endpoints
pub struct ChatCompletionClient {
    client: reqwest::Client,
    completions_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    /// Build a client from the `[llm]` config section
    ///
    /// The request timeout from config bounds every completion call; a
    /// timeout surfaces as [`AppError::Completion`] like any other failure.
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        let completions_url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        Ok(Self {
            client,
            completions_url,
            model: config.model.clone(),
            api_key,
        })
    }

    fn completion_error(&self, reason: impl std::fmt::Display) -> AppError {
        AppError::Completion {
            endpoint: self.completions_url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl CompletionService for ChatCompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> AppResult<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature,
            max_tokens,
        };

        let mut builder = self.client.post(&self.completions_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.completion_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.completion_error(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| self.completion_error(format!("malformed response body: {e}")))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| self.completion_error("response contained no choices"))?;

        Ok(content)
    }
}
