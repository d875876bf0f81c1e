//! Errors from the GitHub API, split by whether retrying can help.

use std::fmt;

use thiserror::Error;

/// Whether a failed call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// 5xx, 429, rate-limit 403s, GraphQL rate limiting and network failures.
    Transient,
    /// Everything else: missing PRs or comments, bad credentials, validation
    /// failures, unparseable responses.
    Permanent,
}

impl GitHubErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A failed GitHub call.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {code}): {}", self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    fn bare(kind: GitHubErrorKind, message: String) -> Self {
        Self {
            kind,
            status_code: None,
            message,
            source: None,
        }
    }

    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self::bare(GitHubErrorKind::Permanent, message.into())
    }

    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self::bare(GitHubErrorKind::Transient, message.into())
    }

    /// Builds an error from the `errors` array of a GraphQL response.
    ///
    /// GraphQL reports rate limiting in-band with HTTP 200, so the message
    /// text decides the kind.
    pub fn from_graphql_errors(messages: &[String]) -> Self {
        let joined = messages.join("; ");
        let kind = if mentions_any(&joined, RATE_LIMIT_HINTS) {
            GitHubErrorKind::Transient
        } else {
            GitHubErrorKind::Permanent
        };
        Self::bare(kind, format!("GraphQL errors: {joined}"))
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// Classifies an octocrab failure.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = status_of(&err);
        let message = err.to_string();
        Self {
            kind: categorize(status_code, &message),
            status_code,
            message,
            source: Some(err),
        }
    }
}

const RATE_LIMIT_HINTS: &[&str] = &["rate limit", "api rate", "abuse detection"];
const NETWORK_HINTS: &[&str] = &["timeout", "timed out", "connection", "network", "dns"];

fn mentions_any(message: &str, hints: &[&str]) -> bool {
    let lower = message.to_lowercase();
    hints.iter().any(|hint| lower.contains(hint))
}

/// HTTP status of an octocrab error. Non-API errors sometimes only carry it
/// in their rendered text as `status: NNN`.
fn status_of(err: &octocrab::Error) -> Option<u16> {
    if let octocrab::Error::GitHub { source, .. } = err {
        return Some(source.status_code.as_u16());
    }

    let rendered = err.to_string();
    let (_, rest) = rendered.split_once("status: ")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn categorize(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    let transient = match status_code {
        Some(429) => true,
        Some(403) => mentions_any(message, RATE_LIMIT_HINTS),
        Some(code) => (500..600).contains(&code),
        None => mentions_any(message, NETWORK_HINTS),
    };
    if transient {
        GitHubErrorKind::Transient
    } else {
        GitHubErrorKind::Permanent
    }
}
