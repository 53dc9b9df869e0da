//! OpenAI Chat Completions client
//!
//! Used for outreach draft generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, ChatProvider, Credentials, http_client, post_json};
use crate::ai::retry::{RetryPolicy, retry_with_backoff};
use crate::config::EndpointConfig;
use crate::types::Result;

pub struct OpenAiChat {
    credentials: Credentials,
    api_base: String,
    model: String,
    temperature: Option<f32>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiChat {
    pub fn new(endpoint: &EndpointConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            credentials: Credentials::from_endpoint(endpoint)?,
            api_base: endpoint.api_base.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            temperature: endpoint.temperature,
            client: http_client(endpoint)?,
            retry,
        })
    }

    fn build_request<'a>(&'a self, messages: &'a [ChatMessage]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = self.build_request(messages);

        debug!(model = %self.model, messages = messages.len(), "OpenAI chat completion");

        let response: CompletionResponse = retry_with_backoff(
            &self.retry,
            "openai chat completion",
            Some(&self.credentials),
            || post_json(&self.client, &url, &self.credentials, &request, "openai"),
        )
        .await?;

        Ok(response.into_content())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl CompletionResponse {
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
