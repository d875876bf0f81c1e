use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use needs_retitle::config::ConfigStore;
use needs_retitle::effects::GitHubInterpreter;
use needs_retitle::github::{DryRunInterpreter, OctocrabClient};
use needs_retitle::options::{LogFormat, ServerOptions};
use needs_retitle::policy::PLUGIN_NAME;
use needs_retitle::server::{AppState, build_router, serve_until};
use needs_retitle::webhooks::WebhookSecret;
use needs_retitle::worker::{Dispatcher, join_loops, run_config_reload, run_scan_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let options = ServerOptions::from_env();
    init_tracing(options.log_format);

    info!(
        plugin = PLUGIN_NAME,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = options.dry_run,
        "Starting"
    );

    let secret = WebhookSecret::new(read_secret(&options.hmac_secret_file)?);
    let token = match &options.github_token_file {
        Some(path) => read_secret(path)?,
        None => std::env::var("GITHUB_TOKEN")
            .context("no GitHub token file configured and GITHUB_TOKEN is unset")?,
    };
    let client = OctocrabClient::from_token(token)
        .context("failed to build GitHub client")?
        .with_throttle(options.throttle);

    let store = Arc::new(ConfigStore::new());
    store
        .reload(&options.config_path)
        .with_context(|| format!("failed to load {}", options.config_path.display()))?;

    if options.dry_run {
        run(DryRunInterpreter::new(client), store, secret, &options).await
    } else {
        run(client, store, secret, &options).await
    }
}

async fn run<G: GitHubInterpreter + 'static>(
    github: G,
    store: Arc<ConfigStore>,
    secret: WebhookSecret,
    options: &ServerOptions,
) -> Result<()> {
    let github = Arc::new(github);
    let shutdown = CancellationToken::new();

    let reload = tokio::spawn(run_config_reload(
        Arc::clone(&store),
        options.config_path.clone(),
        options.config_reload_interval,
        shutdown.clone(),
    ));
    let scan = tokio::spawn(run_scan_loop(
        Arc::clone(&github),
        Arc::clone(&store),
        options.update_period,
        shutdown.clone(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        github,
        store,
        options.max_in_flight,
        shutdown.clone(),
    ));
    let app = build_router(AppState::new(secret, Arc::clone(&dispatcher)));

    let addr = SocketAddr::from(([0, 0, 0, 0], options.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let served = serve_until(listener, app, shutdown.clone(), options.shutdown_grace).await;

    info!("Shutting down");
    shutdown.cancel();
    dispatcher.drain(options.shutdown_grace).await;
    join_loops([("config reload", reload), ("scan", scan)]).await;

    served.context("server error")
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "needs_retitle=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn read_secret(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(contents.trim().to_string())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
