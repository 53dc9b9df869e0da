//! Throttled Invoker
//!
//! Admission control for provider calls. Calls are queued in arrival
//! order and drained in batches of at most `concurrency`; after a batch
//! settles the drainer sleeps `batch_delay` before starting the next one,
//! but only if more work is waiting. A single drain task runs at a time
//! per throttle, and a new one starts as soon as work arrives on an idle
//! throttle.
//!
//! Each call settles independently: an `Err` or panic in one job never
//! affects the others in its batch, and the batch still waits for every
//! member before the cooldown starts.
//!
//! Cancelling the shared [`CancellationToken`] abandons the in-flight
//! batch and drops everything queued; pending callers receive
//! [`ThrottleError::Cancelled`].

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{ResearchError, Result};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Why a throttled call produced no value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThrottleError {
    #[error("throttled call cancelled")]
    Cancelled,
    #[error("throttled call panicked: {0}")]
    Aborted(String),
}

impl From<ThrottleError> for ResearchError {
    fn from(err: ThrottleError) -> Self {
        match err {
            ThrottleError::Cancelled => ResearchError::Cancelled,
            ThrottleError::Aborted(msg) => ResearchError::ProviderApi(msg),
        }
    }
}

struct Queue {
    jobs: VecDeque<Job>,
    processing: bool,
}

struct Shared {
    name: String,
    concurrency: usize,
    batch_delay: Duration,
    queue: Mutex<Queue>,
    cancel: CancellationToken,
}

/// FIFO batch limiter shared by every caller of one provider operation.
///
/// Cloning is cheap; clones share the queue.
#[derive(Clone)]
pub struct Throttle {
    shared: Arc<Shared>,
}

impl Throttle {
    /// Create a throttle. `concurrency` must be at least 1.
    pub fn new(
        name: impl Into<String>,
        concurrency: usize,
        batch_delay: Duration,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let name = name.into();
        if concurrency == 0 {
            return Err(ResearchError::Config(format!(
                "Throttle '{}' needs a concurrency of at least 1",
                name
            )));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                concurrency,
                batch_delay,
                queue: Mutex::new(Queue {
                    jobs: VecDeque::new(),
                    processing: false,
                }),
                cancel,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn concurrency(&self) -> usize {
        self.shared.concurrency
    }

    /// Queue `f` and wait until it has actually run.
    pub async fn call<F, Fut, T>(&self, f: F) -> std::result::Result<T, ThrottleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.shared.cancel.is_cancelled() {
            return Err(ThrottleError::Cancelled);
        }

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { f().await })
                .catch_unwind()
                .await
                .map_err(|payload| ThrottleError::Aborted(panic_message(payload.as_ref())));
            // Receiver may be gone if the caller stopped waiting
            let _ = tx.send(outcome);
        });

        self.enqueue(job).await;

        rx.await.unwrap_or(Err(ThrottleError::Cancelled))
    }

    async fn enqueue(&self, job: Job) {
        let start_drain = {
            let mut queue = self.shared.queue.lock().await;
            queue.jobs.push_back(job);
            !std::mem::replace(&mut queue.processing, true)
        };

        if start_drain {
            tokio::spawn(Self::drain(Arc::clone(&self.shared)));
        }
    }

    async fn drain(shared: Arc<Shared>) {
        loop {
            let batch: Vec<Job> = {
                let mut queue = shared.queue.lock().await;
                if shared.cancel.is_cancelled() {
                    let dropped = std::mem::take(&mut queue.jobs);
                    queue.processing = false;
                    drop(queue);
                    debug!(throttle = %shared.name, dropped = dropped.len(), "Throttle cancelled");
                    return;
                }
                if queue.jobs.is_empty() {
                    queue.processing = false;
                    return;
                }
                let take = shared.concurrency.min(queue.jobs.len());
                queue.jobs.drain(..take).collect()
            };

            debug!(throttle = %shared.name, size = batch.len(), "Running batch");

            let settled = tokio::select! {
                _ = join_all(batch) => true,
                _ = shared.cancel.cancelled() => false,
            };
            if !settled {
                continue;
            }

            let more_waiting = !shared.queue.lock().await.jobs.is_empty();
            if more_waiting && !shared.batch_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(shared.batch_delay) => {}
                    _ = shared.cancel.cancelled() => {}
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn throttle(concurrency: usize, delay_ms: u64) -> Throttle {
        Throttle::new(
            "test",
            concurrency,
            Duration::from_millis(delay_ms),
            CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = Throttle::new("zero", 0, Duration::ZERO, CancellationToken::new());
        assert!(matches!(err, Err(ResearchError::Config(_))));
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let throttle = throttle(3, 5);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let calls = (0..10).map(|i| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            throttle.call(move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                i
            })
        });

        let results: Vec<_> = join_all(calls).await;
        assert_eq!(
            results.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>(),
            (0..10).collect::<Vec<_>>()
        );
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batch_cooldown() {
        let throttle = throttle(2, 500);

        let calls = (0..4).map(|_| {
            throttle.call(|| async {
                let start = Instant::now();
                (start, Instant::now())
            })
        });

        let mut spans: Vec<(Instant, Instant)> =
            join_all(calls).await.into_iter().map(|r| r.unwrap()).collect();
        spans.sort_by_key(|(start, _)| *start);

        let first_batch_done = spans[0].1.max(spans[1].1);
        assert!(spans[2].0.duration_since(first_batch_done) >= Duration::from_millis(500));
        assert!(spans[3].0.duration_since(first_batch_done) >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_failures_settle_independently() {
        let throttle = throttle(2, 0);

        let calls = (0..4).map(|i| {
            throttle.call(move || async move {
                if i == 1 {
                    Err(format!("call {} failed", i))
                } else {
                    Ok(i)
                }
            })
        });

        let results: Vec<_> = join_all(calls)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(results[0], Ok(0));
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok(2));
        assert_eq!(results[3], Ok(3));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let throttle = throttle(2, 0);

        let panicked = throttle
            .call(|| async {
                if true {
                    panic!("provider exploded");
                }
                1
            })
            .await;
        assert_eq!(
            panicked,
            Err(ThrottleError::Aborted("provider exploded".to_string()))
        );

        let next = throttle.call(|| async { 2 }).await;
        assert_eq!(next, Ok(2));
    }

    #[tokio::test]
    async fn test_restarts_after_idle() {
        let throttle = throttle(1, 0);
        assert_eq!(throttle.call(|| async { 1 }).await, Ok(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(throttle.call(|| async { 2 }).await, Ok(2));
    }

    #[tokio::test]
    async fn test_cancellation_drops_queued_work() {
        let cancel = CancellationToken::new();
        let throttle = Throttle::new("cancel", 1, Duration::ZERO, cancel.clone()).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        let calls = (0..3).map(|_| {
            let ran = Arc::clone(&ran);
            throttle.call(move || async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                ran.fetch_add(1, Ordering::SeqCst);
            })
        });

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        };

        let (results, _) = tokio::join!(join_all(calls), canceller);
        assert!(
            results
                .iter()
                .all(|r| *r == Err(ThrottleError::Cancelled))
        );
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        let late = throttle.call(|| async { 1 }).await;
        assert_eq!(late, Err(ThrottleError::Cancelled));
    }
}
