//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (platform config dir) and project (.campaign-research/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::types::{ResearchError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// AI provider endpoints
    pub providers: ProvidersConfig,

    /// Throttled invoker settings shared by every provider operation
    pub throttle: ThrottleConfig,

    /// Retry-with-backoff settings for provider calls
    pub retry: RetryConfig,

    /// Response acceptance filter
    pub acceptance: AcceptanceConfig,

    /// Research step settings
    pub research: ResearchConfig,

    /// Database and commit protocol
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            providers: ProvidersConfig::default(),
            throttle: ThrottleConfig::default(),
            retry: RetryConfig::default(),
            acceptance: AcceptanceConfig::default(),
            research: ResearchConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ResearchError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.throttle.concurrency == 0 {
            return Err(ResearchError::Config(
                "throttle.concurrency must be at least 1".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ResearchError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        for (name, endpoint) in [
            ("chat", &self.providers.chat),
            ("grounded", &self.providers.grounded),
            ("rag", &self.providers.rag),
        ] {
            endpoint.validate(name)?;
        }

        if self.research.sell_side_batch_size == 0 || self.storage.sell_side_chunk_size == 0 {
            return Err(ResearchError::Config(
                "Seller-side batch and chunk sizes must be at least 1".to_string(),
            ));
        }

        if self.storage.commit_timeout_secs == 0 || self.storage.commit_max_wait_secs == 0 {
            return Err(ResearchError::Config(
                "Commit wait and timeout bounds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Providers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Use canned offline providers instead of network calls
    pub offline: bool,

    #[serde(default = "EndpointConfig::openai")]
    pub chat: EndpointConfig,

    #[serde(default = "EndpointConfig::perplexity")]
    pub grounded: EndpointConfig,

    #[serde(default = "EndpointConfig::bedrock")]
    pub rag: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            offline: false,
            chat: EndpointConfig::openai(),
            grounded: EndpointConfig::perplexity(),
            rag: EndpointConfig::bedrock(),
        }
    }
}

/// One provider endpoint.
///
/// Keys are read from the environment variable named by `api_key_env`
/// unless `api_key` is set directly. `api_key` is never serialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Provider kind: openai, perplexity, bedrock
    pub provider: String,
    pub model: String,
    pub api_base: String,
    pub api_key_env: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    /// Grounded provider only
    pub return_citations: bool,
    /// RAG provider only
    pub region: Option<String>,
    /// RAG provider only
    pub knowledge_base_id: Option<String>,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("return_citations", &self.return_citations)
            .field("region", &self.region)
            .field("knowledge_base_id", &self.knowledge_base_id)
            .finish()
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::openai()
    }
}

impl EndpointConfig {
    pub fn openai() -> Self {
        Self {
            provider: "openai".to_string(),
            model: constants::provider::OPENAI_MODEL.to_string(),
            api_base: constants::provider::OPENAI_API_BASE.to_string(),
            api_key_env: constants::provider::OPENAI_KEY_ENV.to_string(),
            api_key: None,
            timeout_secs: constants::provider::DEFAULT_TIMEOUT_SECS,
            temperature: None,
            return_citations: false,
            region: None,
            knowledge_base_id: None,
        }
    }

    pub fn perplexity() -> Self {
        Self {
            provider: "perplexity".to_string(),
            model: constants::provider::PERPLEXITY_MODEL.to_string(),
            api_base: constants::provider::PERPLEXITY_API_BASE.to_string(),
            api_key_env: constants::provider::PERPLEXITY_KEY_ENV.to_string(),
            temperature: Some(constants::provider::PERPLEXITY_TEMPERATURE),
            return_citations: true,
            ..Self::openai()
        }
    }

    pub fn bedrock() -> Self {
        let region = constants::provider::BEDROCK_REGION;
        Self {
            provider: "bedrock".to_string(),
            model: constants::provider::BEDROCK_MODEL_ARN.to_string(),
            api_base: format!("https://bedrock-agent-runtime.{}.amazonaws.com", region),
            api_key_env: constants::provider::BEDROCK_KEY_ENV.to_string(),
            region: Some(region.to_string()),
            ..Self::openai()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ResearchError::Config(format!(
                "providers.{}.timeout_secs must be greater than 0",
                name
            )));
        }

        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ResearchError::Config(format!(
                "providers.{}.temperature must be between 0.0 and 2.0, got {}",
                name, temperature
            )));
        }

        url::Url::parse(&self.api_base).map_err(|e| {
            ResearchError::Config(format!(
                "providers.{}.api_base '{}' is not a valid URL: {}",
                name, self.api_base, e
            ))
        })?;

        Ok(())
    }
}

// =============================================================================
// Throttle & Retry
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Maximum simultaneous calls per operation
    pub concurrency: usize,
    /// Cooldown between batches in milliseconds
    pub batch_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            concurrency: constants::throttle::DEFAULT_CONCURRENCY,
            batch_delay_ms: constants::throttle::DEFAULT_BATCH_DELAY_MS,
        }
    }
}

impl ThrottleConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::retry::DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: constants::retry::INITIAL_DELAY_MS,
            max_delay_ms: constants::retry::MAX_DELAY_MS,
            factor: constants::retry::BACKOFF_FACTOR,
        }
    }
}

// =============================================================================
// Acceptance & Research
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Substrings meaning "the provider found nothing"
    pub no_data_keywords: Vec<String>,
    /// Substrings meaning "the provider drifted into financial boilerplate"
    pub financial_keywords: Vec<String>,
    /// Run the grounded verification query after the keyword check
    pub verify: bool,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            no_data_keywords: owned(constants::acceptance::NO_DATA_KEYWORDS),
            financial_keywords: owned(constants::acceptance::FINANCIAL_KEYWORDS),
            verify: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Recency cutoff for the job-challenges topic
    pub job_challenges_anchor: String,
    /// Recency cutoff for news, priorities and values topics
    pub recent_anchor: String,
    /// How the sender introduces themselves in drafts
    pub sender_role: String,
    pub sell_side_batch_size: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            job_challenges_anchor: constants::research::JOB_CHALLENGES_ANCHOR.to_string(),
            recent_anchor: constants::research::RECENT_ANCHOR.to_string(),
            sender_role: "Co-founder".to_string(),
            sell_side_batch_size: constants::research::SELL_SIDE_BATCH_SIZE,
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    /// Maximum wait for the commit connection (seconds)
    pub commit_max_wait_secs: u64,
    /// Maximum duration of the commit transaction (seconds)
    pub commit_timeout_secs: u64,
    pub sell_side_chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(constants::storage::PROJECT_DIR)
                .join(constants::storage::DATABASE_FILE),
            commit_max_wait_secs: constants::storage::COMMIT_MAX_WAIT_SECS,
            commit_timeout_secs: constants::storage::COMMIT_TIMEOUT_SECS,
            sell_side_chunk_size: constants::storage::SELL_SIDE_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.throttle.concurrency, 3);
        assert_eq!(config.throttle.batch_delay(), Duration::from_millis(2000));
        assert_eq!(config.providers.grounded.temperature, Some(0.5));
        assert!(config.providers.grounded.return_citations);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.throttle.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("throttle.concurrency"));
    }

    #[test]
    fn test_bad_api_base_rejected() {
        let mut config = Config::default();
        config.providers.rag.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_and_not_serialized() {
        let mut endpoint = EndpointConfig::openai();
        endpoint.api_key = Some("sk-secret".to_string());

        let debug = format!("{:?}", endpoint);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&endpoint).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
