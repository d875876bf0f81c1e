//! Applying the policy decision to a single pull request.
//!
//! [`reconcile`] is shared by the webhook path and the bulk scan. It resolves
//! the marker label if needed, asks [`decide`] what to do, and turns the
//! resulting [`Action`] into GitHub effects.
//!
//! Label mutations are best-effort: a failure is logged and the comment step
//! still runs. Comment, listing and bot-identity failures are returned.

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Configuration;
use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::policy::{
    Action, NEEDS_RETITLE_LABEL, NoOpReason, decide, format_response, is_stale_comment,
};
use crate::types::{CommentId, MarkerLabel, PrNumber, ReconciliationTarget, RepoId};

/// Errors that abort reconciliation of one pull request.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A GitHub call failed.
    #[error("GitHub {operation} failed: {message}")]
    GitHub {
        operation: &'static str,
        message: String,
    },

    /// GitHub answered with a response of the wrong kind.
    #[error("unexpected response to {expected}: {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },
}

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The pull request is merged and was left alone.
    SkippedMerged,

    /// No mutation was needed.
    Unchanged(NoOpReason),

    /// The explanatory comment was posted. `labeled` is false if adding the
    /// label failed.
    Flagged { comment_id: CommentId, labeled: bool },

    /// The title was fixed; stale comments were deleted.
    Cleared { deleted: usize, unlabeled: bool },
}

/// Runs one effect, mapping interpreter errors into [`ReconcileError`].
async fn run<G: GitHubInterpreter>(
    github: &G,
    effect: GitHubEffect,
) -> Result<GitHubResponse, ReconcileError> {
    let operation = effect.name();
    github
        .interpret(effect)
        .await
        .map_err(|e| ReconcileError::GitHub {
            operation,
            message: e.to_string(),
        })
}

fn unexpected(expected: &'static str, got: &GitHubResponse) -> ReconcileError {
    ReconcileError::UnexpectedResponse {
        expected,
        got: got.name(),
    }
}

/// Reconciles the marker label and comment of one pull request.
#[instrument(skip_all, fields(repo = %target.repo, pr = %target.number))]
pub async fn reconcile<G: GitHubInterpreter>(
    github: &G,
    target: &ReconciliationTarget,
    config: Option<&Configuration>,
) -> Result<Outcome, ReconcileError> {
    if target.merged {
        debug!("Pull request is merged, skipping");
        return Ok(Outcome::SkippedMerged);
    }

    let Some(config) = config else {
        warn!("No configuration loaded, skipping");
        return Ok(Outcome::Unchanged(NoOpReason::NoConfiguration));
    };

    let has_label = match target.marker {
        MarkerLabel::Present => true,
        MarkerLabel::Absent => false,
        MarkerLabel::Unknown => {
            let effect = GitHubEffect::GetLabels {
                repo: target.repo.clone(),
                pr: target.number,
            };
            match run(github, effect).await? {
                GitHubResponse::Labels(labels) => labels.iter().any(|l| l == NEEDS_RETITLE_LABEL),
                other => return Err(unexpected("get_labels", &other)),
            }
        }
    };

    match decide(&target.title, has_label, Some(config)) {
        Action::NoOp(reason) => {
            debug!(?reason, "Nothing to do");
            Ok(Outcome::Unchanged(reason))
        }
        Action::AddLabelAndComment { message } => flag(github, target, &message).await,
        Action::RemoveLabelAndPruneComments { message } => clear(github, target, &message).await,
    }
}

/// Builds a target by fetching the pull request live.
///
/// Used when the triggering event does not carry the pull request, as with
/// comments.
pub async fn fetch_target<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<ReconciliationTarget, ReconcileError> {
    let effect = GitHubEffect::GetPr {
        repo: repo.clone(),
        pr,
    };
    match run(github, effect).await? {
        GitHubResponse::Pr(data) => Ok(ReconciliationTarget {
            repo: data.repo,
            number: data.number,
            author: data.author,
            title: data.title,
            merged: data.merged,
            marker: MarkerLabel::Unknown,
        }),
        other => Err(unexpected("get_pr", &other)),
    }
}

/// Adds the label and posts the explanatory comment.
async fn flag<G: GitHubInterpreter>(
    github: &G,
    target: &ReconciliationTarget,
    message: &str,
) -> Result<Outcome, ReconcileError> {
    let add = GitHubEffect::AddLabel {
        repo: target.repo.clone(),
        pr: target.number,
        label: NEEDS_RETITLE_LABEL.to_string(),
    };
    let labeled = match run(github, add).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Failed to add label");
            false
        }
    };

    let post = GitHubEffect::PostComment {
        repo: target.repo.clone(),
        pr: target.number,
        body: format_response(&target.author, message),
    };
    let comment_id = match run(github, post).await? {
        GitHubResponse::CommentPosted { id } => id,
        other => return Err(unexpected("post_comment", &other)),
    };

    info!(labeled, comment_id = comment_id.0, "Flagged non-compliant title");
    Ok(Outcome::Flagged {
        comment_id,
        labeled,
    })
}

/// Removes the label and deletes the bot's comments that carry `message`.
async fn clear<G: GitHubInterpreter>(
    github: &G,
    target: &ReconciliationTarget,
    message: &str,
) -> Result<Outcome, ReconcileError> {
    let remove = GitHubEffect::RemoveLabel {
        repo: target.repo.clone(),
        pr: target.number,
        label: NEEDS_RETITLE_LABEL.to_string(),
    };
    let unlabeled = match run(github, remove).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Failed to remove label");
            false
        }
    };

    let bot_login = match run(github, GitHubEffect::GetBotUser).await? {
        GitHubResponse::BotUser { login } => login,
        other => return Err(unexpected("get_bot_user", &other)),
    };

    let list = GitHubEffect::ListComments {
        repo: target.repo.clone(),
        pr: target.number,
    };
    let comments = match run(github, list).await? {
        GitHubResponse::Comments(comments) => comments,
        other => return Err(unexpected("list_comments", &other)),
    };

    let mut deleted = 0;
    for comment in comments
        .iter()
        .filter(|c| is_stale_comment(&bot_login, message, &c.author_login, &c.body))
    {
        let delete = GitHubEffect::DeleteComment {
            repo: target.repo.clone(),
            comment_id: comment.id,
        };
        run(github, delete).await?;
        deleted += 1;
    }

    info!(unlabeled, deleted, "Cleared retitled pull request");
    Ok(Outcome::Cleared { deleted, unlabeled })
}
