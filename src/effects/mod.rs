//! Effects-as-data for GitHub operations.
//!
//! The reconciliation core describes every GitHub call as a [`GitHubEffect`]
//! value and hands it to a [`GitHubInterpreter`]. This keeps the core free of
//! HTTP details and makes every call it makes observable in tests.

pub mod github;
pub mod interpreter;

pub use github::{CommentData, GitHubEffect, GitHubResponse, PrData, SearchPage};
pub use interpreter::GitHubInterpreter;
