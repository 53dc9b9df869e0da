//! Perplexity grounded search client
//!
//! Perplexity exposes an OpenAI-compatible chat endpoint whose answers are
//! grounded in live web results. Source URLs come back in a top-level
//! `citations` array when `return_citations` is set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, Credentials, GroundedProvider, GroundedReply, http_client, post_json};
use crate::ai::retry::{RetryPolicy, retry_with_backoff};
use crate::config::EndpointConfig;
use crate::types::Result;

pub struct PerplexitySearch {
    credentials: Credentials,
    api_base: String,
    model: String,
    temperature: Option<f32>,
    citations_enabled: bool,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl std::fmt::Debug for PerplexitySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerplexitySearch")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("citations_enabled", &self.citations_enabled)
            .finish()
    }
}

impl PerplexitySearch {
    pub fn new(endpoint: &EndpointConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            credentials: Credentials::from_endpoint(endpoint)?,
            api_base: endpoint.api_base.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            temperature: endpoint.temperature,
            citations_enabled: endpoint.return_citations,
            client: http_client(endpoint)?,
            retry,
        })
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        want_citations: bool,
    ) -> SearchRequest<'a> {
        SearchRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            return_citations: want_citations && self.citations_enabled,
        }
    }
}

#[async_trait]
impl GroundedProvider for PerplexitySearch {
    async fn search(
        &self,
        messages: &[ChatMessage],
        want_citations: bool,
    ) -> Result<GroundedReply> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = self.build_request(messages, want_citations);

        debug!(
            model = %self.model,
            citations = request.return_citations,
            "Perplexity grounded search"
        );

        let response: SearchResponse = retry_with_backoff(
            &self.retry,
            "perplexity search",
            Some(&self.credentials),
            || post_json(&self.client, &url, &self.credentials, &request, "perplexity"),
        )
        .await?;

        Ok(response.into_reply(request.return_citations))
    }

    fn name(&self) -> &str {
        "perplexity"
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    return_citations: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Option<Vec<String>>,
}

impl SearchResponse {
    fn into_reply(self, keep_citations: bool) -> GroundedReply {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let citations = if keep_citations {
            self.citations.unwrap_or_default()
        } else {
            Vec::new()
        };
        GroundedReply { text, citations }
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

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "choices": [{"message": {"role": "assistant", "content": "Acme opened a Berlin office."}}],
        "citations": ["https://acme.example/news", "https://press.example/acme"]
    }"#;

    #[test]
    fn test_reply_keeps_citations_when_requested() {
        let body: SearchResponse = serde_json::from_str(BODY).unwrap();
        let reply = body.into_reply(true);
        assert_eq!(reply.text, "Acme opened a Berlin office.");
        assert_eq!(reply.citations.len(), 2);
    }

    #[test]
    fn test_reply_drops_citations_when_not_requested() {
        let body: SearchResponse = serde_json::from_str(BODY).unwrap();
        assert!(body.into_reply(false).citations.is_empty());
    }

    #[test]
    fn test_citations_flag_respects_endpoint_setting() {
        let mut endpoint = EndpointConfig::perplexity();
        endpoint.api_key = Some("pplx-test".to_string());
        endpoint.return_citations = false;
        let search =
            PerplexitySearch::new(&endpoint, RetryPolicy::once(endpoint.timeout())).unwrap();

        let messages = [ChatMessage::user("q")];
        assert!(!search.build_request(&messages, true).return_citations);
    }
}
