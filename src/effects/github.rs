//! GitHub API effect types.
//!
//! These types describe GitHub API operations as data, without executing them.
//! The octocrab interpreter in [`crate::github`] executes them; tests use a
//! recording mock.

use serde::{Deserialize, Serialize};

use crate::types::{CommentId, PrNumber, ReconciliationTarget, RepoId};

/// A GitHub API effect.
///
/// Every repository-level effect names its repository: one interpreter
/// serves all organizations enabled for the bot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Queries ──────────────────────────────────────────────────────────────
    /// List the label names on a pull request.
    GetLabels { repo: RepoId, pr: PrNumber },

    /// List all issue comments on a pull request.
    ListComments { repo: RepoId, pr: PrNumber },

    /// Resolve the account the bot acts as.
    GetBotUser,

    /// Fetch a single pull request.
    GetPr { repo: RepoId, pr: PrNumber },

    /// Fetch one page of a pull request search (GraphQL, 100 per page).
    SearchPullRequests {
        query: String,
        cursor: Option<String>,
    },

    // ─── Mutations ────────────────────────────────────────────────────────────
    /// Add a label. Adding a label that is already present is a no-op on GitHub.
    AddLabel {
        repo: RepoId,
        pr: PrNumber,
        label: String,
    },

    /// Remove a label.
    RemoveLabel {
        repo: RepoId,
        pr: PrNumber,
        label: String,
    },

    /// Post a new comment on a pull request.
    PostComment {
        repo: RepoId,
        pr: PrNumber,
        body: String,
    },

    /// Delete an issue comment.
    DeleteComment {
        repo: RepoId,
        comment_id: CommentId,
    },
}

impl GitHubEffect {
    /// Whether executing this effect changes anything on GitHub.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            GitHubEffect::AddLabel { .. }
                | GitHubEffect::RemoveLabel { .. }
                | GitHubEffect::PostComment { .. }
                | GitHubEffect::DeleteComment { .. }
        )
    }

    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubEffect::GetLabels { .. } => "get_labels",
            GitHubEffect::ListComments { .. } => "list_comments",
            GitHubEffect::GetBotUser => "get_bot_user",
            GitHubEffect::GetPr { .. } => "get_pr",
            GitHubEffect::SearchPullRequests { .. } => "search_pull_requests",
            GitHubEffect::AddLabel { .. } => "add_label",
            GitHubEffect::RemoveLabel { .. } => "remove_label",
            GitHubEffect::PostComment { .. } => "post_comment",
            GitHubEffect::DeleteComment { .. } => "delete_comment",
        }
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// A comment as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentData {
    pub id: CommentId,
    pub author_login: String,
    pub body: String,
}

/// The subset of a pull request that reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrData {
    pub repo: RepoId,
    pub number: PrNumber,
    pub title: String,
    pub author: String,
    pub merged: bool,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Pull requests on this page, with their marker label already resolved.
    pub items: Vec<ReconciliationTarget>,

    /// Whether another page follows.
    pub has_next_page: bool,

    /// Cursor to request the next page.
    pub end_cursor: Option<String>,

    /// Rate-limit points this page cost.
    pub cost: u64,

    /// Rate-limit points remaining after this page.
    pub remaining: u64,
}

/// Response from executing a GitHub effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Label names on a pull request.
    Labels(Vec<String>),

    /// Comments on a pull request, oldest first.
    Comments(Vec<CommentData>),

    /// The bot's own login.
    BotUser { login: String },

    /// A single pull request.
    Pr(PrData),

    /// A page of search results.
    SearchPage(SearchPage),

    /// Label added.
    LabelAdded,

    /// Label removed.
    LabelRemoved,

    /// Comment posted.
    CommentPosted { id: CommentId },

    /// Comment deleted.
    CommentDeleted,
}

impl GitHubResponse {
    /// Short name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubResponse::Labels(_) => "labels",
            GitHubResponse::Comments(_) => "comments",
            GitHubResponse::BotUser { .. } => "bot_user",
            GitHubResponse::Pr(_) => "pr",
            GitHubResponse::SearchPage(_) => "search_page",
            GitHubResponse::LabelAdded => "label_added",
            GitHubResponse::LabelRemoved => "label_removed",
            GitHubResponse::CommentPosted { .. } => "comment_posted",
            GitHubResponse::CommentDeleted => "comment_deleted",
        }
    }
}
