//! Bounded retries with exponential backoff for gateway calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use relay_types::GatewayError;

/// Retry policy applied around every outbound gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. Returns the last error on exhaustion.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient gateway failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Backoff before attempt `attempt + 1`, with ±25% jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << (attempt - 1).min(16));
        Duration::from_millis(jitter_ms(exp))
    }
}

fn jitter_ms(base: u64) -> u64 {
    let quarter = base / 4;
    if quarter == 0 {
        return base;
    }
    base - quarter + rand::rng().random_range(0..=quarter * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = fast(3)
            .run("test", move |_| async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(GatewayError::Rejected {
                        status: 502,
                        message: "bad gateway".into(),
                    })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = fast(2)
            .run("test", move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Timeout)
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = fast(5)
            .run("test", move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Rejected {
                    status: 400,
                    message: "invalid payer".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Rejected { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let _: Result<(), _> = fast(0)
            .run("test", move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Timeout)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        for _ in 0..100 {
            let j = jitter_ms(1000);
            assert!((750..=1250).contains(&j));
        }
        assert_eq!(jitter_ms(0), 0);
    }
}
