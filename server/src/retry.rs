use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Distinguishes failures worth another attempt from final ones.
#[derive(Debug)]
pub enum RetryError {
    /// Retryable error (network issues, server errors, rate limiting)
    Retryable(anyhow::Error),
    /// Non-retryable error (client errors other than 429)
    NonRetryable(anyhow::Error),
}

impl RetryError {
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            RetryError::Retryable(err) | RetryError::NonRetryable(err) => err,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    max_attempts: u32,
    /// Base delay for exponential backoff.
    base_delay_ms: u64,
    /// Maximum jitter to add to backoff delay (as fraction of delay, e.g., 0.25 = ±25%).
    jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 500,
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    #[cfg(test)]
    pub fn new(max_attempts: u32, base_delay_ms: u64, jitter_factor: f64) -> Self {
        RetryConfig {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            jitter_factor,
        }
    }

    /// Same backoff, different attempt count.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Run `func` until it succeeds, fails for good, or attempts run out. The
/// last error is returned as is.
pub async fn with_retry<F, Fut, T>(func: F, config: &RetryConfig) -> Result<T, RetryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let mut attempt = 0;
    loop {
        match func().await {
            Ok(result) => return Ok(result),
            Err(RetryError::Retryable(err)) if attempt + 1 < config.max_attempts => {
                log::warn!("Retryable error: {}", err);
                let delay = backoff_with_jitter(attempt, config);
                log::warn!(
                    "Retry attempt {}/{} after {:?}",
                    attempt + 1,
                    config.max_attempts - 1,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Calculate backoff delay with jitter for a given attempt.
///
/// Uses exponential backoff: base_delay * 2^attempt
/// Adds random jitter of ±jitter_factor.
fn backoff_with_jitter(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = config.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    let jitter_range = (base_delay as f64 * config.jitter_factor) as u64;
    let jitter = rand::rng().random_range(0..=jitter_range * 2) as i64 - jitter_range as i64;
    let delay_ms = (base_delay as i64 + jitter).max(0) as u64;
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant() -> RetryConfig {
        RetryConfig::new(3, 0, 0.0)
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RetryError::Retryable(anyhow::anyhow!("timeout")))
                } else {
                    Ok("page")
                }
            },
            &instant(),
        )
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::Retryable(anyhow::anyhow!("502 Bad Gateway")))
            },
            &instant(),
        )
        .await;

        let err = result.unwrap_err().into_inner();
        assert_eq!(err.to_string(), "502 Bad Gateway");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::NonRetryable(anyhow::anyhow!("403 Forbidden")))
            },
            &instant(),
        )
        .await;

        assert!(matches!(result, Err(RetryError::NonRetryable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let config = RetryConfig::new(5, 100, 0.0);
        assert_eq!(backoff_with_jitter(0, &config), Duration::from_millis(100));
        assert_eq!(backoff_with_jitter(1, &config), Duration::from_millis(200));
        assert_eq!(backoff_with_jitter(3, &config), Duration::from_millis(800));
    }

    #[test]
    fn test_with_max_attempts_keeps_backoff() {
        let config = RetryConfig::default().with_max_attempts(7);
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.base_delay_ms, RetryConfig::default().base_delay_ms);
        assert_eq!(config.jitter_factor, RetryConfig::default().jitter_factor);

        assert_eq!(RetryConfig::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let config = RetryConfig::new(5, 1000, 0.25);
        for _ in 0..100 {
            let delay = backoff_with_jitter(0, &config).as_millis();
            assert!((750..=1250).contains(&delay));
        }
    }
}
