//! Per-call timeout helper
//!
//! Every provider attempt is bounded; a timed-out attempt surfaces as
//! `ResearchError::Timeout`, which the retry wrapper treats as recoverable.

use std::future::Future;
use std::time::Duration;

use crate::types::{ResearchError, Result};

/// Execute an async operation with a timeout
///
/// # Example
///
/// ```ignore
/// let text = with_timeout(
///     Duration::from_secs(30),
///     async { client.rag(prompt).await },
///     "bedrock retrieveAndGenerate"
/// ).await?;
/// ```
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ResearchError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, ResearchError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, ResearchError>(42)
            },
            "slow operation",
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ResearchError::Timeout { .. }));
        assert!(err.is_recoverable());
    }
}
