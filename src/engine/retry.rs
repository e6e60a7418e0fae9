//! Retry policy for rate-limited upstream calls.

use crate::config::Config;
use crate::utils::error::FetchError;
use std::future::Future;
use std::time::Duration;

/// Only `RateLimited` is retried, after a fixed delay. Everything else fails
/// the attempt immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 1, delay: Duration::from_millis(1_000) }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry.max_retries, config.rate_limit_delay())
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

/// Run `op`, retrying on `RateLimited` up to the policy's limit.
pub async fn with_retry<T, F, Fut>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            | Err(FetchError::RateLimited) if attempt < policy.max_retries => {
                attempt += 1;
                log::warn!(
                    "{}: rate limited, retry {}/{} in {:?}",
                    label,
                    attempt,
                    policy.max_retries,
                    policy.delay
                );
                metrics::counter!("cryptopulse_fetch_retries_total", "source" => label.to_string()).increment(1);
                tokio::time::sleep(policy.delay).await;
            }
            | other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_single_retry_then_success() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(5));
        let res = with_retry("t", &policy, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(FetchError::RateLimited)
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(res, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_rate_limit_is_final() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(5));
        let res: Result<(), _> = with_retry("t", &policy, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::RateLimited)
        })
        .await;
        assert_eq!(res, Err(FetchError::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let calls = &AtomicU32::new(0);
        let res: Result<(), _> = with_retry("t", &RetryPolicy::default(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::NotFound)
        })
        .await;
        assert_eq!(res, Err(FetchError::NotFound));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
