//! Event dispatch: from a verified webhook delivery to a reconciliation task.
//!
//! Decoding happens on the caller's task so a malformed payload can be
//! reported back to GitHub. Reconciliation runs in a spawned task:
//!
//! ```text
//! ┌─────────────┐     ┌──────────┐     ┌───────────┐
//! │   axum      │ ──► │ dispatch │ ──► │ semaphore │ ──► reconcile
//! │  (accepts)  │     │ (decode) │     │  (cap N)  │
//! └─────────────┘     └──────────┘     └───────────┘
//!       │
//!       │ returns 200 once decoded
//!       ▼
//! ```
//!
//! Tasks are spawned on a [`TaskTracker`] so shutdown can wait for in-flight
//! reconciliations, and a task still waiting for a permit gives up when the
//! shutdown token is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span, debug, error, info, info_span};

use crate::config::ConfigStore;
use crate::effects::GitHubInterpreter;
use crate::reconcile::{ReconcileError, fetch_target, reconcile};
use crate::types::{DeliveryId, PrNumber, ReconciliationTarget, RepoId};
use crate::webhooks::{GitHubEvent, ParseError, parse_webhook};

/// Why a delivery did not start a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not a `pull_request` or `issue_comment` event.
    EventType,
    /// A pull request action that cannot change the title.
    Action,
    /// A comment on an issue that is not a pull request.
    NotAPullRequest,
}

/// What `dispatch` did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Spawned,
    Ignored(IgnoreReason),
}

/// What a spawned task has to reconcile.
enum Job {
    /// The event carried the pull request.
    Target(ReconciliationTarget),
    /// Only the number is known; fetch the pull request first.
    Fetch { repo: RepoId, pr: PrNumber },
}

/// Routes webhook deliveries to supervised reconciliation tasks.
pub struct Dispatcher<G> {
    github: Arc<G>,
    config: Arc<ConfigStore>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl<G: GitHubInterpreter + 'static> Dispatcher<G> {
    /// Creates a dispatcher allowing at most `max_in_flight` concurrent
    /// reconciliations.
    pub fn new(
        github: Arc<G>,
        config: Arc<ConfigStore>,
        max_in_flight: usize,
        shutdown: CancellationToken,
    ) -> Self {
        info!(max_in_flight, "Creating dispatcher");

        Dispatcher {
            github,
            config,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tracker: TaskTracker::new(),
            shutdown,
        }
    }

    /// Decodes a delivery and, if it is relevant, spawns its reconciliation.
    ///
    /// Only decoding errors are returned. Reconciliation errors end in the
    /// spawned task's log.
    pub fn dispatch(
        &self,
        event_type: &str,
        delivery: &DeliveryId,
        payload: &[u8],
    ) -> Result<Dispatched, ParseError> {
        let Some(event) = parse_webhook(event_type, payload)? else {
            debug!(event_type, delivery_id = %delivery, "Ignoring event type");
            return Ok(Dispatched::Ignored(IgnoreReason::EventType));
        };

        let job = match event {
            GitHubEvent::PullRequest(pr) => {
                if !pr.action.triggers_reconciliation() {
                    debug!(repo = %pr.repo, pr = %pr.number, action = ?pr.action, "Ignoring pull request action");
                    return Ok(Dispatched::Ignored(IgnoreReason::Action));
                }
                Job::Target(pr.target())
            }
            GitHubEvent::IssueComment(comment) => match comment.pr_number {
                Some(pr) => Job::Fetch {
                    repo: comment.repo,
                    pr,
                },
                None => {
                    debug!(repo = %comment.repo, "Ignoring comment on plain issue");
                    return Ok(Dispatched::Ignored(IgnoreReason::NotAPullRequest));
                }
            },
        };

        let span = info_span!("reconcile_event", event_type, delivery_id = %delivery);
        self.spawn(job, span);
        Ok(Dispatched::Spawned)
    }

    fn spawn(&self, job: Job, span: Span) {
        let github = Arc::clone(&self.github);
        let config = Arc::clone(&self.config);
        let permits = Arc::clone(&self.permits);
        let shutdown = self.shutdown.clone();

        self.tracker.spawn(
            async move {
                let _permit = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        debug!("Shutting down before reconciliation started");
                        return;
                    }
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };

                if let Err(e) = run_job(github.as_ref(), &config, job).await {
                    error!(error = %e, "Reconciliation failed");
                }
            }
            .instrument(span),
        );
    }

    /// Returns the number of reconciliation tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting work and waits up to `grace` for running tasks.
    ///
    /// Returns `false` if the grace period ran out first.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            error!(remaining = self.tracker.len(), "Reconciliations still running after grace period");
        }
        drained
    }
}

async fn run_job<G: GitHubInterpreter>(
    github: &G,
    config: &ConfigStore,
    job: Job,
) -> Result<(), ReconcileError> {
    let target = match job {
        Job::Target(target) => target,
        Job::Fetch { repo, pr } => fetch_target(github, &repo, pr).await?,
    };
    let config = config.get();
    let outcome = reconcile(github, &target, config.as_deref()).await?;
    debug!(repo = %target.repo, pr = %target.number, ?outcome, "Reconciled");
    Ok(())
}
