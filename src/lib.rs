//! needs-retitle - a GitHub bot that flags pull requests whose titles do not
//! match a configured pattern.
//!
//! A PR with a non-conforming title gets the `needs-retitle` label and an
//! explanatory comment. Once the title is fixed the label is removed and the
//! bot's stale comments are deleted. The bot reacts to webhooks and also
//! sweeps every open PR in its configured scopes on a timer.

pub mod config;
pub mod effects;
pub mod github;
pub mod options;
pub mod policy;
pub mod reconcile;
pub mod scan;
pub mod server;
pub mod types;
pub mod webhooks;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
