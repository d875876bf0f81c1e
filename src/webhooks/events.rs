//! GitHub webhook event types.
//!
//! Only the two events that can change what the bot should do are modelled:
//!
//! - `pull_request` - the title may have changed
//! - `issue_comment` - a nudge to re-check a pull request by commenting on it

use serde::{Deserialize, Serialize};

use crate::types::{MarkerLabel, PrNumber, ReconciliationTarget, RepoId};

/// A parsed GitHub webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitHubEvent {
    PullRequest(PullRequestEvent),
    IssueComment(IssueCommentEvent),
}

/// Action performed on a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    Reopened,
    /// New commits were pushed.
    Synchronize,
    /// Title, body or base branch changed.
    Edited,
    /// Anything else (`closed`, `labeled`, `assigned`, ...).
    #[serde(other)]
    Other,
}

impl PrAction {
    /// Parses the payload's `action` field. Unrecognized actions map to `Other`.
    pub fn parse(action: &str) -> Self {
        match action {
            "opened" => PrAction::Opened,
            "reopened" => PrAction::Reopened,
            "synchronize" => PrAction::Synchronize,
            "edited" => PrAction::Edited,
            _ => PrAction::Other,
        }
    }

    /// Whether this action warrants re-checking the title.
    pub fn triggers_reconciliation(self) -> bool {
        !matches!(self, PrAction::Other)
    }
}

/// A pull request event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub repo: RepoId,
    pub action: PrAction,
    pub number: PrNumber,
    pub title: String,
    pub author: String,
    pub merged: bool,
}

impl PullRequestEvent {
    /// The reconciliation target for this event. Labels are fetched live.
    pub fn target(&self) -> ReconciliationTarget {
        ReconciliationTarget {
            repo: self.repo.clone(),
            number: self.number,
            author: self.author.clone(),
            title: self.title.clone(),
            merged: self.merged,
            marker: MarkerLabel::Unknown,
        }
    }
}

/// An issue or pull request conversation comment event.
///
/// Comments on the PR conversation tab arrive as issue comments. Every
/// comment action triggers a re-check, so neither the action nor the
/// commenter is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    pub repo: RepoId,

    /// Set only when the comment is on a pull request.
    pub pr_number: Option<PrNumber>,
}
