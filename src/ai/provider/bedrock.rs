//! Bedrock knowledge-base client
//!
//! Calls the agent runtime `retrieveAndGenerate` operation against a
//! knowledge base holding the seller's case studies and value
//! propositions. Authentication uses a Bedrock API key sent as a bearer
//! token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Credentials, RagProvider, http_client, post_json};
use crate::ai::retry::{RetryPolicy, retry_with_backoff};
use crate::config::EndpointConfig;
use crate::types::{ResearchError, Result};

pub struct BedrockRag {
    credentials: Credentials,
    api_base: String,
    knowledge_base_id: String,
    model_arn: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl std::fmt::Debug for BedrockRag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockRag")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("knowledge_base_id", &self.knowledge_base_id)
            .field("model_arn", &self.model_arn)
            .finish()
    }
}

impl BedrockRag {
    pub fn new(endpoint: &EndpointConfig, retry: RetryPolicy) -> Result<Self> {
        let knowledge_base_id = endpoint
            .knowledge_base_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ResearchError::Config(
                    "Bedrock RAG needs providers.rag.knowledge_base_id".to_string(),
                )
            })?;

        Ok(Self {
            credentials: Credentials::from_endpoint(endpoint)?,
            api_base: endpoint.api_base.trim_end_matches('/').to_string(),
            knowledge_base_id,
            model_arn: endpoint.model.clone(),
            client: http_client(endpoint)?,
            retry,
        })
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> RetrieveAndGenerateRequest<'a> {
        RetrieveAndGenerateRequest {
            input: Input { text: prompt },
            configuration: Configuration {
                kind: "KNOWLEDGE_BASE",
                knowledge_base: KnowledgeBaseConfiguration {
                    knowledge_base_id: &self.knowledge_base_id,
                    model_arn: &self.model_arn,
                },
            },
        }
    }
}

#[async_trait]
impl RagProvider for BedrockRag {
    async fn rag(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/retrieveAndGenerate", self.api_base);
        let request = self.build_request(prompt);

        debug!(knowledge_base = %self.knowledge_base_id, "Bedrock retrieveAndGenerate");

        let response: RetrieveAndGenerateResponse = retry_with_backoff(
            &self.retry,
            "bedrock retrieveAndGenerate",
            Some(&self.credentials),
            || post_json(&self.client, &url, &self.credentials, &request, "bedrock"),
        )
        .await?;

        Ok(response.output.map(|o| o.text).unwrap_or_default())
    }

    fn name(&self) -> &str {
        "bedrock"
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct RetrieveAndGenerateRequest<'a> {
    input: Input<'a>,
    #[serde(rename = "retrieveAndGenerateConfiguration")]
    configuration: Configuration<'a>,
}

#[derive(Debug, Serialize)]
struct Input<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Configuration<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "knowledgeBaseConfiguration")]
    knowledge_base: KnowledgeBaseConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseConfiguration<'a> {
    knowledge_base_id: &'a str,
    model_arn: &'a str,
}

#[derive(Debug, Deserialize)]
struct RetrieveAndGenerateResponse {
    output: Option<Output>,
}

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> EndpointConfig {
        let mut endpoint = EndpointConfig::bedrock();
        endpoint.api_key = Some("bedrock-test".to_string());
        endpoint.knowledge_base_id = Some("KB123".to_string());
        endpoint
    }

    #[test]
    fn test_requires_knowledge_base() {
        let mut endpoint = endpoint();
        endpoint.knowledge_base_id = None;
        let err = BedrockRag::new(&endpoint, RetryPolicy::once(endpoint.timeout())).unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }

    #[test]
    fn test_request_shape() {
        let endpoint = endpoint();
        let rag = BedrockRag::new(&endpoint, RetryPolicy::once(endpoint.timeout())).unwrap();
        let json = serde_json::to_value(rag.build_request("Summarize case studies")).unwrap();

        assert_eq!(json["input"]["text"], "Summarize case studies");
        let config = &json["retrieveAndGenerateConfiguration"];
        assert_eq!(config["type"], "KNOWLEDGE_BASE");
        assert_eq!(config["knowledgeBaseConfiguration"]["knowledgeBaseId"], "KB123");
        assert_eq!(config["knowledgeBaseConfiguration"]["modelArn"], endpoint.model);
    }

    #[test]
    fn test_response_output_text() {
        let body: RetrieveAndGenerateResponse =
            serde_json::from_str(r#"{"output":{"text":"Case study: Acme cut costs 20%."}}"#)
                .unwrap();
        assert_eq!(
            body.output.map(|o| o.text).unwrap_or_default(),
            "Case study: Acme cut costs 20%."
        );
    }
}
