//! GitHub API client and effect interpreter.
//!
//! This module provides the implementation for executing GitHub effects via the octocrab
//! library. It implements the `GitHubInterpreter` trait defined in the effects module.
//!
//! Key features:
//! - Exponential backoff retry for transient failures
//! - Distinguishes transient vs permanent errors
//! - GraphQL search with rate-limit cost reporting for the bulk scan
//! - A client-side call throttle (token bucket)
//! - A dry-run wrapper that only performs reads

mod client;
mod dry_run;
mod error;
mod interpreter;
mod retry;
mod throttle;

pub use client::OctocrabClient;
pub use dry_run::DryRunInterpreter;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use retry::{RetryConfig, retry_with_backoff};
pub use throttle::ThrottleConfig;
