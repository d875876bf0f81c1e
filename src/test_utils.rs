//! Shared test utilities: a recording GitHub double and target builders.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use crate::effects::{
    CommentData, GitHubEffect, GitHubInterpreter, GitHubResponse, PrData, SearchPage,
};
use crate::types::{CommentId, MarkerLabel, PrNumber, ReconciliationTarget, RepoId};

/// Login the mock answers `GetBotUser` with.
pub const BOT_LOGIN: &str = "retitle-bot";

pub fn arb_pr_number() -> impl Strategy<Value = PrNumber> {
    (1u64..100_000).prop_map(PrNumber)
}

pub fn arb_title() -> impl Strategy<Value = String> {
    "[a-zA-Z:() ]{0,40}".prop_map(String::from)
}

/// A webhook-style target whose label state must be fetched.
pub fn target(title: &str) -> ReconciliationTarget {
    ReconciliationTarget {
        repo: RepoId::new("acme", "widgets"),
        number: PrNumber(42),
        author: "alice".to_string(),
        title: title.to_string(),
        merged: false,
        marker: MarkerLabel::Unknown,
    }
}

pub fn comment(id: u64, author: &str, body: &str) -> CommentData {
    CommentData {
        id: CommentId(id),
        author_login: author.to_string(),
        body: body.to_string(),
    }
}

#[derive(Default)]
struct MockState {
    labels: Vec<String>,
    comments: Vec<CommentData>,
    pr: Option<PrData>,
    search_pages: VecDeque<SearchPage>,
    /// Effect names that fail, optionally only for one pull request.
    failures: Vec<(&'static str, Option<PrNumber>)>,
    recorded: Vec<GitHubEffect>,
    next_comment_id: u64,
}

/// A scripted GitHub interpreter that records every effect it receives.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the recording through another.
#[derive(Clone, Default)]
pub struct MockGitHub {
    state: Arc<Mutex<MockState>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(self, labels: Vec<String>) -> Self {
        self.state.lock().unwrap().labels = labels;
        self
    }

    pub fn with_comments(self, comments: Vec<CommentData>) -> Self {
        self.state.lock().unwrap().comments = comments;
        self
    }

    pub fn with_pr(self, pr: PrData) -> Self {
        self.state.lock().unwrap().pr = Some(pr);
        self
    }

    /// Queues search pages, answered in order.
    pub fn with_search_pages(self, pages: Vec<SearchPage>) -> Self {
        self.state.lock().unwrap().search_pages = pages.into();
        self
    }

    /// Makes every effect called `name` fail.
    pub fn failing(self, name: &'static str) -> Self {
        self.state.lock().unwrap().failures.push((name, None));
        self
    }

    /// Makes effect `name` fail only for pull request `pr`.
    pub fn failing_for(self, name: &'static str, pr: PrNumber) -> Self {
        self.state.lock().unwrap().failures.push((name, Some(pr)));
        self
    }

    /// Every effect received so far, in order.
    pub fn recorded(&self) -> Vec<GitHubEffect> {
        self.state.lock().unwrap().recorded.clone()
    }

    /// Recorded effects that mutate GitHub.
    pub fn mutations(&self) -> Vec<GitHubEffect> {
        self.recorded()
            .into_iter()
            .filter(GitHubEffect::is_mutation)
            .collect()
    }

    /// How many recorded effects are called `name`.
    pub fn count(&self, name: &str) -> usize {
        self.recorded().iter().filter(|e| e.name() == name).count()
    }

    fn respond(&self, effect: GitHubEffect) -> Result<GitHubResponse, String> {
        let mut state = self.state.lock().unwrap();
        state.recorded.push(effect.clone());

        let pr = effect_pr(&effect);
        let fails = state
            .failures
            .iter()
            .any(|(name, only)| *name == effect.name() && (only.is_none() || *only == pr));
        if fails {
            return Err(format!("injected failure: {}", effect.name()));
        }

        let response = match effect {
            GitHubEffect::GetLabels { .. } => GitHubResponse::Labels(state.labels.clone()),
            GitHubEffect::ListComments { .. } => GitHubResponse::Comments(state.comments.clone()),
            GitHubEffect::GetBotUser => GitHubResponse::BotUser {
                login: BOT_LOGIN.to_string(),
            },
            GitHubEffect::GetPr { .. } => match state.pr.clone() {
                Some(pr) => GitHubResponse::Pr(pr),
                None => return Err("no pull request scripted".to_string()),
            },
            GitHubEffect::SearchPullRequests { .. } => match state.search_pages.pop_front() {
                Some(page) => GitHubResponse::SearchPage(page),
                None => return Err("no search page scripted".to_string()),
            },
            GitHubEffect::AddLabel { label, .. } => {
                state.labels.push(label);
                GitHubResponse::LabelAdded
            }
            GitHubEffect::RemoveLabel { label, .. } => {
                state.labels.retain(|l| *l != label);
                GitHubResponse::LabelRemoved
            }
            GitHubEffect::PostComment { body, .. } => {
                state.next_comment_id += 1;
                let id = CommentId(1_000 + state.next_comment_id);
                state.comments.push(CommentData {
                    id,
                    author_login: BOT_LOGIN.to_string(),
                    body,
                });
                GitHubResponse::CommentPosted { id }
            }
            GitHubEffect::DeleteComment { comment_id, .. } => {
                state.comments.retain(|c| c.id != comment_id);
                GitHubResponse::CommentDeleted
            }
        };
        Ok(response)
    }
}

fn effect_pr(effect: &GitHubEffect) -> Option<PrNumber> {
    match effect {
        GitHubEffect::GetLabels { pr, .. }
        | GitHubEffect::ListComments { pr, .. }
        | GitHubEffect::GetPr { pr, .. }
        | GitHubEffect::AddLabel { pr, .. }
        | GitHubEffect::RemoveLabel { pr, .. }
        | GitHubEffect::PostComment { pr, .. } => Some(*pr),
        GitHubEffect::GetBotUser
        | GitHubEffect::SearchPullRequests { .. }
        | GitHubEffect::DeleteComment { .. } => None,
    }
}

impl GitHubInterpreter for MockGitHub {
    type Error = String;

    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
        let response = self.respond(effect);
        async move { response }
    }
}
