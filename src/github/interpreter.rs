//! Runs [`GitHubEffect`]s against GitHub with octocrab.
//!
//! Labels, comments, pull requests and the bot identity go through REST.
//! The bulk scan uses GraphQL search, which returns each PR's labels inline
//! and reports the query's rate-limit cost. Every effect is retried on
//! transient failure.

use serde::Deserialize;

use crate::effects::{
    CommentData, GitHubEffect, GitHubInterpreter, GitHubResponse, PrData, SearchPage,
};
use crate::policy::NEEDS_RETITLE_LABEL;
use crate::types::{CommentId, MarkerLabel, PrNumber, ReconciliationTarget, RepoId};

use super::client::OctocrabClient;
use super::error::GitHubApiError;
use super::retry::retry_with_backoff;

/// Page size for REST listings and the GraphQL search.
const PAGE_SIZE: u8 = 100;

// ─── Interpreter Implementation ───────────────────────────────────────────────

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        retry_with_backoff(self.retry(), effect.name(), || {
            let effect = effect.clone();
            async move {
                if let Some(throttle) = self.throttle() {
                    throttle.acquire().await;
                }
                execute_effect(self, effect).await
            }
        })
        .await
    }
}

/// Executes a single effect without retry logic.
async fn execute_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::GetLabels { repo, pr } => get_labels(client, &repo, pr).await,
        GitHubEffect::ListComments { repo, pr } => list_comments(client, &repo, pr).await,
        GitHubEffect::GetBotUser => get_bot_user(client).await,
        GitHubEffect::GetPr { repo, pr } => get_pr(client, repo, pr).await,
        GitHubEffect::SearchPullRequests { query, cursor } => {
            search_pull_requests(client, &query, cursor.as_deref()).await
        }
        GitHubEffect::AddLabel { repo, pr, label } => add_label(client, &repo, pr, label).await,
        GitHubEffect::RemoveLabel { repo, pr, label } => {
            remove_label(client, &repo, pr, &label).await
        }
        GitHubEffect::PostComment { repo, pr, body } => {
            post_comment(client, &repo, pr, body).await
        }
        GitHubEffect::DeleteComment { repo, comment_id } => {
            delete_comment(client, &repo, comment_id).await
        }
    }
}

// ─── Labels ───────────────────────────────────────────────────────────────────

async fn get_labels(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let mut page = 1u32;
    let mut names = Vec::new();

    loop {
        let result = client
            .inner()
            .issues(&repo.owner, &repo.repo)
            .list_labels_for_issue(pr.0)
            .per_page(PAGE_SIZE)
            .page(page)
            .send()
            .await;

        match result {
            Ok(page_result) => {
                let items = page_result.items;
                let is_last_page = items.len() < usize::from(PAGE_SIZE);
                names.extend(items.into_iter().map(|label| label.name));

                if is_last_page {
                    break;
                }
                page += 1;
            }
            Err(e) => return Err(GitHubApiError::from_octocrab(e)),
        }
    }

    Ok(GitHubResponse::Labels(names))
}

async fn add_label(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
    label: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .issues(&repo.owner, &repo.repo)
        .add_labels(pr.0, &[label])
        .await;

    match result {
        Ok(_) => Ok(GitHubResponse::LabelAdded),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

async fn remove_label(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
    label: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .issues(&repo.owner, &repo.repo)
        .remove_label(pr.0, label)
        .await;

    match result {
        Ok(_) => Ok(GitHubResponse::LabelRemoved),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

// ─── Comments ─────────────────────────────────────────────────────────────────

async fn post_comment(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .issues(&repo.owner, &repo.repo)
        .create_comment(pr.0, body)
        .await;

    match result {
        Ok(comment) => Ok(GitHubResponse::CommentPosted {
            id: CommentId(comment.id.into_inner()),
        }),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

async fn list_comments(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let mut page = 1u32;
    let mut all_comments = Vec::new();

    loop {
        let result = client
            .inner()
            .issues(&repo.owner, &repo.repo)
            .list_comments(pr.0)
            .per_page(PAGE_SIZE)
            .page(page)
            .send()
            .await;

        match result {
            Ok(page_result) => {
                let items = page_result.items;
                let is_last_page = items.len() < usize::from(PAGE_SIZE);

                for comment in items {
                    all_comments.push(CommentData {
                        id: CommentId(comment.id.into_inner()),
                        author_login: comment.user.login,
                        body: comment.body.unwrap_or_default(),
                    });
                }

                if is_last_page {
                    break;
                }
                page += 1;
            }
            Err(e) => return Err(GitHubApiError::from_octocrab(e)),
        }
    }

    Ok(GitHubResponse::Comments(all_comments))
}

async fn delete_comment(
    client: &OctocrabClient,
    repo: &RepoId,
    comment_id: CommentId,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .issues(&repo.owner, &repo.repo)
        .delete_comment(octocrab::models::CommentId::from(comment_id.0))
        .await;

    match result {
        Ok(()) => Ok(GitHubResponse::CommentDeleted),
        // Already gone: another replica or a human got there first.
        Err(e) => {
            let err = GitHubApiError::from_octocrab(e);
            if err.is_not_found() {
                tracing::debug!(repo = %repo, comment_id = comment_id.0, "Comment already deleted");
                Ok(GitHubResponse::CommentDeleted)
            } else {
                Err(err)
            }
        }
    }
}

// ─── Identity & Pull Requests ─────────────────────────────────────────────────

async fn get_bot_user(client: &OctocrabClient) -> Result<GitHubResponse, GitHubApiError> {
    let login = client
        .bot_login_cell()
        .get_or_try_init(|| async {
            client
                .inner()
                .current()
                .user()
                .await
                .map(|user| user.login)
                .map_err(GitHubApiError::from_octocrab)
        })
        .await?;

    Ok(GitHubResponse::BotUser {
        login: login.clone(),
    })
}

async fn get_pr(
    client: &OctocrabClient,
    repo: RepoId,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client.inner().pulls(&repo.owner, &repo.repo).get(pr.0).await;

    match result {
        Ok(pull) => {
            let author = pull.user.map(|user| user.login).ok_or_else(|| {
                GitHubApiError::permanent_without_source(format!(
                    "PR {pr} in {repo} has no author"
                ))
            })?;
            let merged = pull.merged_at.is_some() || pull.merged.unwrap_or(false);

            Ok(GitHubResponse::Pr(PrData {
                repo,
                number: pr,
                title: pull.title.unwrap_or_default(),
                author,
                merged,
            }))
        }
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

// ─── Search (GraphQL) ─────────────────────────────────────────────────────────

/// GraphQL query for one page of open pull requests.
///
/// `rateLimit` is requested alongside the search so each page reports what it
/// cost and how much budget is left.
const SEARCH_QUERY: &str = r#"
query($query: String!, $searchCursor: String) {
    rateLimit {
        cost
        remaining
    }
    search(type: ISSUE, first: 100, after: $searchCursor, query: $query) {
        pageInfo {
            hasNextPage
            endCursor
        }
        nodes {
            ... on PullRequest {
                number
                title
                author {
                    login
                }
                repository {
                    name
                    owner {
                        login
                    }
                }
                labels(first: 100) {
                    nodes {
                        name
                    }
                }
            }
        }
    }
}
"#;

/// A GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    rate_limit: Option<RateLimit>,
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
struct RateLimit {
    cost: u64,
    remaining: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    page_info: PageInfo,
    nodes: Vec<SearchNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

/// A search hit. Non-PR hits come back as empty objects, hence the options.
#[derive(Debug, Default, Deserialize)]
struct SearchNode {
    number: Option<u64>,
    title: Option<String>,
    author: Option<Login>,
    repository: Option<Repository>,
    labels: Option<LabelConnection>,
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    owner: Login,
}

#[derive(Debug, Deserialize)]
struct LabelConnection {
    nodes: Vec<LabelNode>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

async fn search_pull_requests(
    client: &OctocrabClient,
    query: &str,
    cursor: Option<&str>,
) -> Result<GitHubResponse, GitHubApiError> {
    let result: Result<GraphQlResponse<SearchData>, _> = client
        .inner()
        .graphql(&serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": {
                "query": query,
                "searchCursor": cursor,
            },
        }))
        .await;

    match result {
        Ok(response) => parse_search_response(response).map(GitHubResponse::SearchPage),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

/// Converts a raw search response into a page of reconciliation targets.
fn parse_search_response(
    response: GraphQlResponse<SearchData>,
) -> Result<SearchPage, GitHubApiError> {
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(GitHubApiError::from_graphql_errors(&messages));
    }

    let data = response.data.ok_or_else(|| {
        GitHubApiError::permanent_without_source("GraphQL search returned no data")
    })?;

    let (cost, remaining) = data
        .rate_limit
        .map(|r| (r.cost, r.remaining))
        .unwrap_or_default();

    let items = data
        .search
        .nodes
        .into_iter()
        .filter_map(node_to_target)
        .collect();

    Ok(SearchPage {
        items,
        has_next_page: data.search.page_info.has_next_page,
        end_cursor: data.search.page_info.end_cursor,
        cost,
        remaining,
    })
}

/// Builds a target from a search hit, skipping anything that is not a PR.
///
/// The search is restricted to open pull requests, so rows are never merged.
fn node_to_target(node: SearchNode) -> Option<ReconciliationTarget> {
    let number = node.number?;
    let repository = node.repository?;
    let labels = node.labels.map(|l| l.nodes).unwrap_or_default();

    Some(ReconciliationTarget {
        repo: RepoId::new(repository.owner.login, repository.name),
        number: PrNumber(number),
        // Deleted accounts come back as a null author.
        author: node.author.map(|a| a.login).unwrap_or_else(|| "ghost".to_string()),
        title: node.title.unwrap_or_default(),
        merged: false,
        marker: MarkerLabel::from_labels(
            labels.iter().map(|l| l.name.as_str()),
            NEEDS_RETITLE_LABEL,
        ),
    })
}
