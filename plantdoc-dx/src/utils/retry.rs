//! Retry with exponential backoff for transient upstream failures
//!
//! **Algorithm:**
//! 1. Attempt operation
//! 2. If successful, return result
//! 3. If the error is transient (service temporarily unavailable):
//!    a. If fewer than `max_retries` retries were made: log WARN, back off, retry
//!    b. Otherwise: log ERROR, return the last error
//! 4. If other error: return error immediately (no retry)
//!
//! **Backoff Strategy:**
//! - Initial delay: `initial_delay` (default 1000ms)
//! - Multiplier: 2.0 (1s, 2s, 4s, ...)
//! - No wall-clock cap beyond the retry count

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that may clear up on their own if the call is repeated
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Bounded retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each following retry
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    pub fn from_millis(max_retries: u32, initial_delay_ms: u64) -> Self {
        Self::new(max_retries, Duration::from_millis(initial_delay_ms))
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(3, 1000)
    }
}

/// Run `operation`, retrying transient failures per `policy`
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "classify google/vit-base-patch16-224")
/// * `policy` - Retry count and backoff schedule
/// * `operation` - Async closure performing one attempt
///
/// # Returns
/// Result from the operation, or the last error once retries are exhausted
pub async fn retry_transient<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let mut retry = 0u32;

    loop {
        match operation().await {
            Ok(result) => {
                if retry > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt = retry + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }

                if retry >= policy.max_retries {
                    tracing::error!(
                        operation = operation_name,
                        attempts = retry + 1,
                        error = %err,
                        "Upstream still unavailable, retries exhausted"
                    );
                    return Err(err);
                }

                let delay = policy.delay_for(retry);

                tracing::warn!(
                    operation = operation_name,
                    attempt = retry + 1,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Upstream temporarily unavailable, will retry after backoff"
                );

                tokio::time::sleep(delay).await;
                retry += 1;
            }
        }
    }
}
