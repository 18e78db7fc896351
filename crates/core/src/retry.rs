//! Retry logic with exponential backoff for transient failures

use crate::{ReseedError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Configuration for quick retries (HTTP calls into qBittorrent or
    /// the search service)
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Configuration for slow retries (filesystem walks, link trees)
    pub fn slow() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Retry policy determines which errors should be retried
#[derive(Debug, Clone, Copy)]
pub enum RetryPolicy {
    /// Retry all errors
    All,
    /// Retry only transient errors (network, timeout, storage)
    Transient,
    /// Never retry
    Never,
}

fn should_retry(err: &ReseedError, policy: RetryPolicy) -> bool {
    match policy {
        RetryPolicy::All => !matches!(err, ReseedError::Canceled { .. }),
        RetryPolicy::Transient => err.is_transient(),
        RetryPolicy::Never => false,
    }
}

/// Execute an async operation with retry logic
pub async fn retry_with_backoff<F, Fut, T>(
    config: RetryConfig,
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;
        debug!(
            "Attempting {} (attempt {}/{})",
            operation_name, attempt, config.max_attempts
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !should_retry(&err, policy) {
                    debug!(
                        "{} failed with non-retryable error: {}",
                        operation_name, err
                    );
                    return Err(err);
                }

                if attempt >= config.max_attempts {
                    error!(
                        "{} failed after {} attempts: {}",
                        operation_name, config.max_attempts, err
                    );
                    return Err(ReseedError::RetryExhausted {
                        operation: operation_name.to_string(),
                        attempts: config.max_attempts,
                        last_error: Box::new(err),
                    });
                }

                let sleep_for = if config.jitter {
                    let jitter = rand::random::<f64>() * 0.3 + 0.85;
                    delay.mul_f64(jitter)
                } else {
                    delay
                };

                debug!(
                    "{} attempt {} failed ({}), retrying in {:?}",
                    operation_name, attempt, err, sleep_for
                );
                sleep(sleep_for).await;

                delay = delay.mul_f64(config.backoff_multiplier).min(config.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> ReseedError {
        ReseedError::ExternalServiceError {
            service: "test".to_string(),
            error: "connection reset".to_string(),
        }
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(RetryConfig::quick(), RetryPolicy::Transient, "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(RetryConfig::quick(), RetryPolicy::Transient, "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_validation_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> =
            retry_with_backoff(RetryConfig::quick(), RetryPolicy::Transient, "op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ReseedError::ValidationError {
                        field: "x".to_string(),
                        message: "bad".to_string(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> =
            retry_with_backoff(RetryConfig::quick(), RetryPolicy::Transient, "op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;
        assert!(matches!(
            result,
            Err(ReseedError::RetryExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limits_are_not_retried_inline() {
        let calls = AtomicU32::new(0);
        let result: Result<()> =
            retry_with_backoff(RetryConfig::quick(), RetryPolicy::Transient, "op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ReseedError::RateLimited {
                        indexer_id: 7,
                        retry_after_secs: 600,
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(ReseedError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
