//! Retry with exponential backoff for provider calls
//!
//! Wraps one provider request: each attempt is bounded by the endpoint
//! timeout, only recoverable errors (rate limits, network, 5xx, timeouts)
//! are retried, and the provider's credentials are refreshed before the
//! next attempt.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use super::provider::Credentials;
use super::timeout::with_timeout;
use crate::config::{EndpointConfig, RetryConfig};
use crate::types::{ResearchError, Result};

/// Backoff schedule for one provider endpoint
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f32,
    /// Bound on each individual attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(retry: &RetryConfig, endpoint: &EndpointConfig) -> Self {
        Self {
            max_attempts: retry.max_attempts.max(1),
            initial_delay: Duration::from_millis(retry.initial_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            factor: retry.factor,
            attempt_timeout: endpoint.timeout(),
        }
    }

    /// Single attempt, no backoff
    pub fn once(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
            attempt_timeout,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .with_jitter()
    }
}

/// Run `op` until it succeeds, fails with a non-recoverable error, or
/// the attempt budget is spent.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    credentials: Option<&Credentials>,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempt_timeout = policy.attempt_timeout;
    let attempt = || with_timeout(attempt_timeout, op(), operation);

    attempt
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(ResearchError::is_recoverable)
        .notify(|err: &ResearchError, delay: Duration| {
            warn!(
                operation,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Provider call failed, retrying"
            );
            if let Some(credentials) = credentials {
                credentials.refresh();
            }
        })
        .await
}
