//! Dry-run wrapper around a GitHub interpreter.
//!
//! Reads go to GitHub so decisions are made against real data; mutations are
//! logged and answered with a plausible success response instead of being
//! executed.

use std::future::Future;

use tracing::info;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::types::CommentId;

/// A GitHub interpreter that never mutates anything.
#[derive(Debug, Clone)]
pub struct DryRunInterpreter<G> {
    inner: G,
}

impl<G> DryRunInterpreter<G> {
    pub fn new(inner: G) -> Self {
        DryRunInterpreter { inner }
    }
}

/// The response a mutation would have produced, or `None` for reads.
fn synthetic_response(effect: &GitHubEffect) -> Option<GitHubResponse> {
    match effect {
        GitHubEffect::AddLabel { .. } => Some(GitHubResponse::LabelAdded),
        GitHubEffect::RemoveLabel { .. } => Some(GitHubResponse::LabelRemoved),
        GitHubEffect::PostComment { .. } => Some(GitHubResponse::CommentPosted { id: CommentId(0) }),
        GitHubEffect::DeleteComment { .. } => Some(GitHubResponse::CommentDeleted),
        GitHubEffect::GetLabels { .. }
        | GitHubEffect::ListComments { .. }
        | GitHubEffect::GetBotUser
        | GitHubEffect::GetPr { .. }
        | GitHubEffect::SearchPullRequests { .. } => None,
    }
}

impl<G: GitHubInterpreter> GitHubInterpreter for DryRunInterpreter<G> {
    type Error = G::Error;

    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
        async move {
            match synthetic_response(&effect) {
                Some(response) => {
                    info!(effect = effect.name(), ?effect, "Dry run: mutation not executed");
                    Ok(response)
                }
                None => self.inner.interpret(effect).await,
            }
        }
    }
}
