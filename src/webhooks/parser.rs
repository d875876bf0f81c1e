//! Decoding of `pull_request` and `issue_comment` payloads.
//!
//! Only the handful of fields reconciliation needs are read: repository,
//! PR number, title, author, merged flag and action. Every other event type
//! decodes to `None` without looking at the body.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{PrNumber, RepoId};

use super::events::{GitHubEvent, IssueCommentEvent, PrAction, PullRequestEvent};

/// A payload that could not be decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Invalid JSON, or a required field is missing or mistyped.
    #[error("invalid payload: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Decodes `payload` according to the `X-GitHub-Event` value.
///
/// Returns `Ok(None)` for event types the bot does not react to.
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<GitHubEvent>, ParseError> {
    match event_type {
        "pull_request" => parse_pull_request(payload).map(|e| Some(GitHubEvent::PullRequest(e))),
        "issue_comment" => parse_issue_comment(payload).map(|e| Some(GitHubEvent::IssueComment(e))),
        _ => Ok(None),
    }
}

// ─── Raw payloads ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawUser,
    name: String,
}

impl RawRepository {
    fn into_repo_id(self) -> RepoId {
        RepoId::new(self.owner.login, self.name)
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    user: RawUser,
    merged: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    issue: RawIssue,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    // Present only when the issue is a pull request.
    pull_request: Option<serde_json::Value>,
}

fn parse_pull_request(payload: &[u8]) -> Result<PullRequestEvent, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    Ok(PullRequestEvent {
        repo: raw.repository.into_repo_id(),
        action: PrAction::parse(&raw.action),
        number: PrNumber(raw.pull_request.number),
        title: raw.pull_request.title,
        author: raw.pull_request.user.login,
        merged: raw.pull_request.merged.unwrap_or(false),
    })
}

fn parse_issue_comment(payload: &[u8]) -> Result<IssueCommentEvent, ParseError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;

    let pr_number = raw.issue.pull_request.map(|_| PrNumber(raw.issue.number));

    Ok(IssueCommentEvent {
        repo: raw.repository.into_repo_id(),
        pr_number,
    })
}
