//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Typed events and the payload parser

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{GitHubEvent, IssueCommentEvent, PrAction, PullRequestEvent};
pub use parser::{ParseError, parse_webhook};
pub use signature::{SignatureError, WebhookSecret};
