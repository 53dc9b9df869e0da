//! AI Provider Abstraction
//!
//! Three provider capabilities feed the research pipeline:
//!
//! - [`ChatProvider`]: chat completion, used for draft generation
//! - [`GroundedProvider`]: web-search grounded answers with citations
//! - [`RagProvider`]: retrieval-augmented generation over the seller's knowledge base
//!
//! Clients return `Result` values; a failed call is an ordinary `Err` that the
//! acceptance filter turns into a rejected verdict. Retries with backoff live in
//! [`crate::ai::retry`] and are applied inside each client.
//!
//! A [`ProviderRegistry`] is built once at startup and handed to the services
//! that need it.

mod bedrock;
mod credentials;
mod offline;
mod openai;
mod perplexity;

#[cfg(test)]
pub(crate) mod testing;

pub use bedrock::BedrockRag;
pub use credentials::Credentials;
pub use offline::OfflineProvider;
pub use openai::OpenAiChat;
pub use perplexity::PerplexitySearch;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ai::retry::RetryPolicy;
use crate::config::{Config, EndpointConfig};
use crate::types::{ErrorCategory, ErrorClassifier, ProviderError, ResearchError, Result};

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Answer from a grounded provider, with the source URLs it cited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedReply {
    pub text: String,
    pub citations: Vec<String>,
}

// =============================================================================
// Provider Traits
// =============================================================================

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Single chat completion. A reply without content is an empty string.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

#[async_trait]
pub trait GroundedProvider: Send + Sync {
    /// Grounded completion. Citations are only requested when `want_citations` is set.
    async fn search(&self, messages: &[ChatMessage], want_citations: bool)
    -> Result<GroundedReply>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait RagProvider: Send + Sync {
    /// Retrieve-and-generate against the configured knowledge base.
    async fn rag(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}

pub type SharedChat = Arc<dyn ChatProvider>;
pub type SharedGrounded = Arc<dyn GroundedProvider>;
pub type SharedRag = Arc<dyn RagProvider>;

// =============================================================================
// Registry
// =============================================================================

/// Provider instances for one process, constructed once.
#[derive(Clone)]
pub struct ProviderRegistry {
    pub chat: SharedChat,
    pub grounded: SharedGrounded,
    pub rag: SharedRag,
}

impl ProviderRegistry {
    pub fn new(chat: SharedChat, grounded: SharedGrounded, rag: SharedRag) -> Self {
        Self {
            chat,
            grounded,
            rag,
        }
    }

    /// Canned providers that never touch the network
    pub fn offline() -> Self {
        let provider = Arc::new(OfflineProvider);
        Self::new(provider.clone(), provider.clone(), provider)
    }

    /// Build every provider named in the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.providers.offline {
            return Ok(Self::offline());
        }

        let providers = &config.providers;
        Ok(Self::new(
            create_chat_provider(&providers.chat, RetryPolicy::new(&config.retry, &providers.chat))?,
            create_grounded_provider(
                &providers.grounded,
                RetryPolicy::new(&config.retry, &providers.grounded),
            )?,
            create_rag_provider(&providers.rag, RetryPolicy::new(&config.retry, &providers.rag))?,
        ))
    }

    /// e.g. `chat=openai grounded=perplexity rag=bedrock`
    pub fn describe(&self) -> String {
        format!(
            "chat={} grounded={} rag={}",
            self.chat.name(),
            self.grounded.name(),
            self.rag.name()
        )
    }
}

pub fn create_chat_provider(endpoint: &EndpointConfig, retry: RetryPolicy) -> Result<SharedChat> {
    match endpoint.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChat::new(endpoint, retry)?)),
        "offline" => Ok(Arc::new(OfflineProvider)),
        other => Err(unknown_provider("chat", other, "openai, offline")),
    }
}

pub fn create_grounded_provider(
    endpoint: &EndpointConfig,
    retry: RetryPolicy,
) -> Result<SharedGrounded> {
    match endpoint.provider.as_str() {
        "perplexity" => Ok(Arc::new(PerplexitySearch::new(endpoint, retry)?)),
        "offline" => Ok(Arc::new(OfflineProvider)),
        other => Err(unknown_provider("grounded", other, "perplexity, offline")),
    }
}

pub fn create_rag_provider(endpoint: &EndpointConfig, retry: RetryPolicy) -> Result<SharedRag> {
    match endpoint.provider.as_str() {
        "bedrock" => Ok(Arc::new(BedrockRag::new(endpoint, retry)?)),
        "offline" => Ok(Arc::new(OfflineProvider)),
        other => Err(unknown_provider("rag", other, "bedrock, offline")),
    }
}

fn unknown_provider(slot: &str, name: &str, supported: &str) -> ResearchError {
    ResearchError::Config(format!(
        "Unknown {} provider: {}. Supported: {}",
        slot, name, supported
    ))
}

/// Shared HTTP client construction with a bounded request timeout
pub(crate) fn http_client(endpoint: &EndpointConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(endpoint.timeout())
        .build()
        .map_err(|e| ResearchError::ProviderApi(format!("Failed to create HTTP client: {}", e)))
}

/// POST a JSON body with bearer auth and decode the JSON reply.
///
/// Transport failures and non-2xx statuses are classified so the retry
/// wrapper can tell rate limits and outages from bad requests.
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    credentials: &Credentials,
    body: &B,
    provider: &str,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .header("Authorization", credentials.bearer())
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| ErrorClassifier::classify_transport(&e, provider))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ErrorClassifier::classify_http_status(status.as_u16(), &body, provider).into());
    }

    response.json().await.map_err(|e| {
        ProviderError::with_provider(
            ErrorCategory::ParseError,
            format!("Failed to parse {} response: {}", provider, e),
            provider,
        )
        .into()
    })
}
