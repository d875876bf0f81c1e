//! Periodic bulk reconciliation.
//!
//! [`scan_all`] searches for every open, non-archived pull request in the
//! configured scopes and reconciles each one. Pages are fetched one at a time
//! through the GraphQL search, which reports the rate-limit cost of each page.
//!
//! A failed page aborts the scan. A failed row is logged and counted, and the
//! scan moves on.

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::{Configuration, Scopes};
use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, SearchPage};
use crate::reconcile::reconcile;

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A search page could not be fetched.
    #[error("search page failed after {pages} page(s): {message}")]
    Page { pages: usize, message: String },

    /// A page promised more results but gave no cursor to fetch them with.
    #[error("page {pages} reported more results without an end cursor")]
    MissingCursor { pages: usize },

    /// The search answered with something other than a page.
    #[error("unexpected response to search: {0}")]
    UnexpectedResponse(&'static str),
}

/// Builds the search query for `scopes`.
///
/// Returns `None` when there is nothing to scan.
pub fn build_query(scopes: &Scopes) -> Option<String> {
    if scopes.is_empty() {
        return None;
    }

    let mut query = String::from("archived:false is:pr is:open");
    for org in &scopes.orgs {
        query.push_str(&format!(" org:\"{org}\""));
    }
    for repo in &scopes.repos {
        query.push_str(&format!(" repo:\"{repo}\""));
    }
    Some(query)
}

/// Pagination state for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanCursor {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    pub cost_accumulated: u64,
    pub remaining: u64,
}

impl ScanCursor {
    /// Folds a fetched page into the cursor.
    fn advance(&mut self, page: &SearchPage) {
        self.end_cursor = page.end_cursor.clone();
        self.has_next_page = page.has_next_page;
        self.cost_accumulated += page.cost;
        self.remaining = page.remaining;
    }
}

/// What one scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// The search query, or `None` if there was nothing to scan.
    pub query: Option<String>,

    /// Pages fetched.
    pub pages: usize,

    /// Pull requests handed to reconciliation.
    pub considered: usize,

    /// Pull requests whose reconciliation failed.
    pub failed: usize,

    /// Rate-limit points spent across all pages.
    pub total_cost: u64,

    /// Rate-limit points left after the last page.
    pub remaining: u64,
}

/// Reconciles every open pull request in the configured scopes.
#[instrument(skip_all)]
pub async fn scan_all<G: GitHubInterpreter>(
    github: &G,
    config: Option<&Configuration>,
) -> Result<ScanReport, ScanError> {
    let Some(config) = config else {
        warn!("No configuration loaded, skipping scan");
        return Ok(ScanReport::default());
    };

    let Some(query) = build_query(config.scopes()) else {
        warn!("No organizations or repositories configured, nothing to scan");
        return Ok(ScanReport::default());
    };

    info!(%query, "Starting scan");

    let mut cursor = ScanCursor::default();
    let mut report = ScanReport {
        query: Some(query.clone()),
        ..ScanReport::default()
    };

    loop {
        let effect = GitHubEffect::SearchPullRequests {
            query: query.clone(),
            cursor: cursor.end_cursor.clone(),
        };
        let page = match github.interpret(effect).await {
            Ok(GitHubResponse::SearchPage(page)) => page,
            Ok(other) => return Err(ScanError::UnexpectedResponse(other.name())),
            Err(e) => {
                return Err(ScanError::Page {
                    pages: report.pages,
                    message: e.to_string(),
                });
            }
        };
        report.pages += 1;
        cursor.advance(&page);

        for target in &page.items {
            report.considered += 1;
            if let Err(e) = reconcile(github, target, Some(config)).await {
                report.failed += 1;
                warn!(repo = %target.repo, pr = %target.number, error = %e, "Failed to reconcile pull request");
            }
        }

        if !cursor.has_next_page {
            break;
        }
        if cursor.end_cursor.is_none() {
            return Err(ScanError::MissingCursor {
                pages: report.pages,
            });
        }
    }

    report.total_cost = cursor.cost_accumulated;
    report.remaining = cursor.remaining;

    info!(
        pages = report.pages,
        considered = report.considered,
        failed = report.failed,
        cost = report.total_cost,
        remaining = report.remaining,
        "Scan complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockGitHub;
    use crate::types::{MarkerLabel, PrNumber, ReconciliationTarget, RepoId};
    use proptest::prelude::*;

    const CONVENTIONAL: &str = "^(fix:|feat:|major:).*$";

    fn config(scopes: &[&str]) -> Configuration {
        Configuration::new(CONVENTIONAL, "", Scopes::parse(scopes).unwrap()).unwrap()
    }

    fn row(n: u64) -> ReconciliationTarget {
        ReconciliationTarget {
            repo: RepoId::new("acme", "widgets"),
            number: PrNumber(n),
            author: "alice".to_string(),
            title: "random change".to_string(),
            merged: false,
            marker: MarkerLabel::Absent,
        }
    }

    fn page(range: std::ops::Range<u64>, next: Option<&str>) -> SearchPage {
        SearchPage {
            items: range.map(row).collect(),
            has_next_page: next.is_some(),
            end_cursor: next.map(String::from),
            cost: 1,
            remaining: 4990,
        }
    }

    #[test]
    fn query_lists_orgs_then_repos() {
        let scopes = Scopes::parse(&["acme", "other/tool", "beta"]).unwrap();
        assert_eq!(
            build_query(&scopes).unwrap(),
            r#"archived:false is:pr is:open org:"acme" org:"beta" repo:"other/tool""#
        );
    }

    #[test]
    fn empty_scopes_build_no_query() {
        assert_eq!(build_query(&Scopes::default()), None);
    }

    #[tokio::test]
    async fn scan_pages_through_results_and_isolates_row_failures() {
        let github = MockGitHub::new()
            .with_search_pages(vec![page(1..101, Some("cursor-1")), page(101..151, None)])
            .failing_for("post_comment", PrNumber(17));

        let report = scan_all(&github, Some(&config(&["acme", "other/tool"])))
            .await
            .unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.considered, 150);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_cost, 2);
        assert_eq!(report.remaining, 4990);
        assert_eq!(github.count("search_pull_requests"), 2);
        assert_eq!(github.count("post_comment"), 150);

        let cursors: Vec<_> = github
            .recorded()
            .into_iter()
            .filter_map(|e| match e {
                GitHubEffect::SearchPullRequests { cursor, .. } => Some(cursor),
                _ => None,
            })
            .collect();
        assert_eq!(cursors, vec![None, Some("cursor-1".to_string())]);
    }

    #[tokio::test]
    async fn rows_use_their_own_labels() {
        let mut labeled = row(5);
        labeled.marker = MarkerLabel::Present;
        let github = MockGitHub::new().with_search_pages(vec![SearchPage {
            items: vec![labeled],
            has_next_page: false,
            end_cursor: None,
            cost: 1,
            remaining: 100,
        }]);

        scan_all(&github, Some(&config(&["acme"]))).await.unwrap();

        assert_eq!(github.count("get_labels"), 0);
        assert!(github.mutations().is_empty());
    }

    #[tokio::test]
    async fn page_failure_aborts_scan() {
        let github = MockGitHub::new()
            .with_search_pages(vec![page(1..101, Some("cursor-1"))])
            .failing("search_pull_requests");

        let err = scan_all(&github, Some(&config(&["acme"])))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Page { pages: 0, .. }));
        assert!(github.mutations().is_empty());
    }

    #[tokio::test]
    async fn next_page_without_cursor_stops_the_scan() {
        let mut cursorless = page(1..3, None);
        cursorless.has_next_page = true;
        let github = MockGitHub::new().with_search_pages(vec![
            cursorless.clone(),
            cursorless.clone(),
            cursorless,
        ]);

        let err = scan_all(&github, Some(&config(&["acme"])))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::MissingCursor { pages: 1 }));
        assert_eq!(github.count("search_pull_requests"), 1);
        assert_eq!(github.count("post_comment"), 2);
    }

    #[tokio::test]
    async fn no_scopes_means_nothing_to_scan() {
        let github = MockGitHub::new();

        let report = scan_all(&github, Some(&config(&[]))).await.unwrap();

        assert_eq!(report.query, None);
        assert!(github.recorded().is_empty());
    }

    #[tokio::test]
    async fn no_configuration_means_nothing_to_scan() {
        let github = MockGitHub::new();

        let report = scan_all(&github, None).await.unwrap();

        assert_eq!(report, ScanReport::default());
        assert!(github.recorded().is_empty());
    }

    proptest! {
        #[test]
        fn cursor_sums_cost_and_keeps_latest_remaining(
            costs in prop::collection::vec((0u64..50, 0u64..5000), 1..10),
        ) {
            let mut cursor = ScanCursor::default();
            for (i, (cost, remaining)) in costs.iter().enumerate() {
                cursor.advance(&SearchPage {
                    items: vec![],
                    has_next_page: i + 1 < costs.len(),
                    end_cursor: Some(format!("cursor-{i}")),
                    cost: *cost,
                    remaining: *remaining,
                });
            }
            let total: u64 = costs.iter().map(|(c, _)| c).sum();
            prop_assert_eq!(cursor.cost_accumulated, total);
            prop_assert_eq!(cursor.remaining, costs.last().unwrap().1);
            prop_assert!(!cursor.has_next_page);
        }
    }
}
