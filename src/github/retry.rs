//! Backoff for transient GitHub failures.
//!
//! Reconciliation and scanning never retry on their own; a failed label
//! fetch, comment post or search page is retried here, inside the
//! interpreter, before the error reaches them.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::GitHubApiError;

/// How often and how patiently a transient failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; each further retry doubles it.
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    /// 3 retries, waiting 2s, 4s and 8s.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
    };

    /// Never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Delay before retry number `retry` (0-indexed).
    pub fn delay_before(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Runs `operation`, retrying transient errors per `config`.
///
/// Permanent errors are returned at once. When retries run out the last
/// transient error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    operation_name: &'static str,
    mut operation: F,
) -> Result<T, GitHubApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let mut retry = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.kind.is_retriable() => return Err(e),
            Err(e) => e,
        };

        if retry >= config.max_retries {
            warn!(
                operation = operation_name,
                attempts = retry + 1,
                error = %err,
                "Giving up on transient GitHub error"
            );
            return Err(err);
        }

        let delay = config.delay_before(retry);
        debug!(
            operation = operation_name,
            retry,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying transient GitHub error"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
