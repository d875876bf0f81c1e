//! Background loops: configuration reload and the periodic bulk scan.
//!
//! Both loops run until the shutdown token is cancelled. Neither ever exits
//! on error: a failed reload keeps the last good configuration and a failed
//! scan waits for the next tick.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ConfigStore;
use crate::effects::GitHubInterpreter;
use crate::scan::scan_all;

/// Shortest period a loop accepts.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longest period a loop accepts (one year).
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Clamps `period` into `MIN_PERIOD..=MAX_PERIOD`, the range tokio's
/// interval timers can schedule.
pub fn clamp_period(period: Duration) -> Duration {
    period.clamp(MIN_PERIOD, MAX_PERIOD)
}

/// Re-reads `path` every `period`.
///
/// The first reload happens one period after start; the caller is expected
/// to have loaded the configuration once already. The file is read on the
/// blocking pool.
pub async fn run_config_reload(
    store: Arc<ConfigStore>,
    path: PathBuf,
    period: Duration,
    shutdown: CancellationToken,
) {
    let period = clamp_period(period);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Config reload loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                let reload = tokio::task::spawn_blocking({
                    let store = Arc::clone(&store);
                    let path = path.clone();
                    move || store.reload(&path)
                });
                match reload.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(path = %path.display(), error = %e, "Failed to reload configuration");
                    }
                    Err(e) => error!(error = %e, "Configuration reload task failed"),
                }
            }
        }
    }
}

/// Scans every `period`, starting immediately.
///
/// Scans run one after another on this task. A scan in progress is dropped
/// when shutdown is requested.
pub async fn run_scan_loop<G: GitHubInterpreter>(
    github: Arc<G>,
    store: Arc<ConfigStore>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(clamp_period(period));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Scan loop shutting down");
                return;
            }
            _ = ticker.tick() => {}
        }

        let config = store.get();
        let scan = scan_all(github.as_ref(), config.as_deref());
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Scan interrupted by shutdown");
                return;
            }
            result = scan => {
                if let Err(e) = result {
                    error!(error = %e, "Scan failed");
                }
            }
        }
    }
}

/// Waits for the background loops to finish, logging any that panicked.
///
/// Returns how many failed.
pub async fn join_loops(
    loops: impl IntoIterator<Item = (&'static str, JoinHandle<()>)>,
) -> usize {
    let mut failed = 0;
    for (task, handle) in loops {
        if let Err(e) = handle.await {
            error!(task, error = %e, "Background loop failed");
            failed += 1;
        }
    }
    failed
}
