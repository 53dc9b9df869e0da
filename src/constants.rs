//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Throttled invoker defaults
pub mod throttle {
    /// Simultaneous provider calls admitted per batch
    pub const DEFAULT_CONCURRENCY: usize = 3;

    /// Cooldown between batches (milliseconds)
    pub const DEFAULT_BATCH_DELAY_MS: u64 = 2000;
}

/// Retry-with-backoff defaults for provider calls
pub mod retry {
    /// Total attempts including the first call
    pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

    /// Delay before the first retry (milliseconds)
    pub const INITIAL_DELAY_MS: u64 = 1000;

    /// Upper bound for a single backoff delay (milliseconds)
    pub const MAX_DELAY_MS: u64 = 30_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Provider endpoints and models
pub mod provider {
    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

    pub const PERPLEXITY_API_BASE: &str = "https://api.perplexity.ai";
    pub const PERPLEXITY_MODEL: &str = "llama-3.1-sonar-small-128k-online";
    pub const PERPLEXITY_KEY_ENV: &str = "PERPLEXITY_API_KEY";
    /// Grounded answers are sampled conservatively
    pub const PERPLEXITY_TEMPERATURE: f32 = 0.5;

    pub const BEDROCK_REGION: &str = "us-east-1";
    pub const BEDROCK_KEY_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";
    pub const BEDROCK_MODEL_ARN: &str =
        "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-3-haiku-20240307-v1:0";

    /// Default request timeout for every provider (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
}

/// Research step defaults
pub mod research {
    /// Literal validity value that disables the recency check
    pub const VALIDITY_IRRELEVANT: &str = "Irrelevant";

    /// Recency anchor for the job-challenges topic
    pub const JOB_CHALLENGES_ANCHOR: &str = "July 1, 2024";

    /// Recency anchor for news, priorities and values topics
    pub const RECENT_ANCHOR: &str = "January 1, 2024";

    /// Separator placed before appended citation URLs
    pub const REFERENCES_HEADER: &str = "\n\nResearch References:\n";

    /// Seller-side questions answered concurrently per batch
    pub const SELL_SIDE_BATCH_SIZE: usize = 5;

    /// Maximum answer columns on a seller-side script row
    pub const SELL_SIDE_COLUMNS: usize = 5;
}

/// Acceptance filter keyword defaults (case-sensitive)
pub mod acceptance {
    /// Phrases signalling the provider found nothing useful
    pub const NO_DATA_KEYWORDS: &[&str] = &[
        "no ",
        "No ",
        "not found",
        "not ",
        "Not ",
        "nothing",
        "Nothing",
        "Nothng",
        "othng ",
        "ot found",
        "NOT FOUND",
    ];

    /// Phrases signalling drift into public-company financial boilerplate
    pub const FINANCIAL_KEYWORDS: &[&str] = &[" shares", " stock", "public offering", "IPO"];
}

/// Storage and commit protocol
pub mod storage {
    /// Project data directory
    pub const PROJECT_DIR: &str = ".campaign-research";

    /// Database file inside the project directory
    pub const DATABASE_FILE: &str = "research.db";

    /// Maximum wait to acquire the commit connection (seconds)
    pub const COMMIT_MAX_WAIT_SECS: u64 = 10;

    /// Maximum duration of the commit transaction (seconds)
    pub const COMMIT_TIMEOUT_SECS: u64 = 30;

    /// Rows per seller-side script insert chunk
    pub const SELL_SIDE_CHUNK_SIZE: usize = 50;
}
