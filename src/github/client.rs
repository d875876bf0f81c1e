//! Octocrab client wrapper.
//!
//! `OctocrabClient` wraps an `Octocrab` instance shared by every repository
//! the bot is enabled on. Effects name their repository explicitly, so one
//! client serves all of them.

use std::sync::Arc;

use octocrab::Octocrab;
use tokio::sync::OnceCell;

use super::retry::RetryConfig;
use super::throttle::{Throttle, ThrottleConfig};

/// A GitHub API client for the bot's account.
#[derive(Clone)]
pub struct OctocrabClient {
    /// The underlying octocrab client.
    client: Octocrab,

    /// Login of the authenticated account, resolved on first use.
    bot_login: Arc<OnceCell<String>>,

    /// Retry behavior for transient failures.
    retry: RetryConfig,

    /// Shared by clones, so every caller draws from one budget.
    throttle: Option<Arc<Throttle>>,
}

impl OctocrabClient {
    /// Creates a new client with the default retry behavior.
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            bot_login: Arc::new(OnceCell::new()),
            retry: RetryConfig::DEFAULT,
            throttle: Throttle::new(ThrottleConfig::DEFAULT).map(Arc::new),
        }
    }

    /// Creates a client from a GitHub token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    /// Overrides the retry behavior.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the call throttle. A zero rate turns it off.
    pub fn with_throttle(mut self, config: ThrottleConfig) -> Self {
        self.throttle = Throttle::new(config).map(Arc::new);
        self
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    pub(super) fn bot_login_cell(&self) -> &OnceCell<String> {
        &self.bot_login
    }

    pub(super) fn retry(&self) -> RetryConfig {
        self.retry
    }

    pub(super) fn throttle(&self) -> Option<&Throttle> {
        self.throttle.as_deref()
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("bot_login", &self.bot_login.get())
            .field("retry", &self.retry)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retry_override_is_kept_and_debug_hides_the_token() {
        let client = OctocrabClient::from_token("ghp_secret")
            .unwrap()
            .with_retry(RetryConfig::NONE);

        assert_eq!(client.retry(), RetryConfig::NONE);
        assert!(client.throttle().is_some());
        let debug = format!("{client:?}");
        assert!(debug.contains("max_retries: 0"));
        assert!(!debug.contains("ghp_secret"));
    }

    #[tokio::test]
    async fn zero_rate_turns_the_throttle_off() {
        let client = OctocrabClient::from_token("ghp_secret")
            .unwrap()
            .with_throttle(ThrottleConfig {
                per_hour: 0,
                burst: 0,
            });

        assert!(client.throttle().is_none());
    }
}
