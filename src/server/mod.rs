//! HTTP server for the needs-retitle bot.
//!
//! # Endpoints
//!
//! - `POST /` and `POST /hook` - GitHub webhook deliveries
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::effects::GitHubInterpreter;
use crate::webhooks::WebhookSecret;
use crate::worker::Dispatcher;

pub mod webhook;

pub use webhook::{WebhookError, webhook_handler};

/// Shared application state, passed to handlers via axum's `State` extractor.
pub struct AppState<G> {
    inner: Arc<AppStateInner<G>>,
}

struct AppStateInner<G> {
    secret: WebhookSecret,
    dispatcher: Arc<Dispatcher<G>>,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G> AppState<G> {
    pub fn new(secret: WebhookSecret, dispatcher: Arc<Dispatcher<G>>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { secret, dispatcher }),
        }
    }

    pub fn secret(&self) -> &WebhookSecret {
        &self.inner.secret
    }

    pub fn dispatcher(&self) -> &Dispatcher<G> {
        &self.inner.dispatcher
    }
}

/// Health check.
async fn health_handler() -> &'static str {
    "OK"
}

/// Builds the axum Router with all endpoints.
pub fn build_router<G: GitHubInterpreter + 'static>(app_state: AppState<G>) -> Router {
    Router::new()
        .route("/", post(webhook_handler::<G>))
        .route("/hook", post(webhook_handler::<G>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

/// Serves `app` until `shutdown` is cancelled.
///
/// After cancellation in-flight requests get at most `grace` to finish;
/// connections still open after that are dropped.
pub async fn serve_until(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> std::io::Result<()> {
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => result,
        _ = shutdown.cancelled() => {
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(grace_ms = grace.as_millis() as u64, "HTTP connections still open after grace period");
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::config::{ConfigStore, Configuration, Scopes};
    use crate::test_utils::MockGitHub;

    const SECRET: &[u8] = b"test-secret";

    fn test_app(github: &MockGitHub) -> (Router, Arc<Dispatcher<MockGitHub>>) {
        let store = ConfigStore::new();
        store.set(Configuration::new("^(fix:|feat:|major:).*$", "", Scopes::default()).unwrap());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(github.clone()),
            Arc::new(store),
            4,
            CancellationToken::new(),
        ));
        let state = AppState::new(WebhookSecret::new(SECRET), Arc::clone(&dispatcher));
        (build_router(state), dispatcher)
    }

    /// Creates a webhook request signed with `secret`.
    fn create_webhook_request(
        uri: &str,
        secret: &[u8],
        event_type: &str,
        body: &[u8],
    ) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-github-event", event_type)
            .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
            .header("x-hub-signature-256", WebhookSecret::new(secret).sign(body))
            .body(Body::from(body.to_vec()))
            .unwrap()
    }

    fn pull_request_body(title: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "action": "opened",
            "pull_request": {
                "number": 5,
                "title": title,
                "user": { "login": "alice" },
                "merged": false
            },
            "repository": { "name": "widgets", "owner": { "login": "acme" } }
        }))
        .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn stalled_upload_does_not_hold_up_shutdown() {
        use tokio::io::AsyncWriteExt;

        let (app, _) = test_app(&MockGitHub::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve_until(
            listener,
            app,
            shutdown.clone(),
            Duration::from_millis(100),
        ));

        // Promise a body that never arrives.
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"POST /hook HTTP/1.1\r\nhost: localhost\r\ncontent-length: 1000\r\n\r\n{")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server outlived its grace period")
            .unwrap();
        assert!(result.is_ok());
        drop(client);
    }

    #[tokio::test]
    async fn idle_server_stops_on_cancel() {
        let (app, _) = test_app(&MockGitHub::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve_until(
            listener,
            app,
            shutdown.clone(),
            Duration::from_secs(30),
        ));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn health_returns_200() {
        let (app, _) = test_app(&MockGitHub::new());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn valid_delivery_is_accepted_and_reconciled() {
        let github = MockGitHub::new();
        let (app, dispatcher) = test_app(&github);

        let request =
            create_webhook_request("/hook", SECRET, "pull_request", &pull_request_body("wip"));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, webhook::ACCEPTED_BODY);

        assert!(dispatcher.drain(Duration::from_secs(5)).await);
        assert_eq!(github.count("add_label"), 1);
        assert_eq!(github.count("post_comment"), 1);
    }

    #[tokio::test]
    async fn root_path_accepts_deliveries() {
        let (app, _) = test_app(&MockGitHub::new());

        let request = create_webhook_request("/", SECRET, "ping", b"{}");
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_signature_is_401_and_not_dispatched() {
        let github = MockGitHub::new();
        let (app, dispatcher) = test_app(&github);

        let request = create_webhook_request(
            "/hook",
            b"wrong-secret",
            "pull_request",
            &pull_request_body("wip"),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(dispatcher.drain(Duration::from_secs(5)).await);
        assert!(github.recorded().is_empty());
    }

    #[tokio::test]
    async fn missing_signature_is_401() {
        let (app, _) = test_app(&MockGitHub::new());

        let request = Request::builder()
            .method("POST")
            .uri("/hook")
            .header("x-github-event", "pull_request")
            .header("x-github-delivery", "1")
            .body(Body::from(pull_request_body("wip")))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_payload_is_400() {
        let (app, _) = test_app(&MockGitHub::new());

        let request = create_webhook_request("/hook", SECRET, "pull_request", b"{\"action\":");
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_event_header_is_400() {
        let (app, _) = test_app(&MockGitHub::new());

        let body = pull_request_body("wip");
        let request = Request::builder()
            .method("POST")
            .uri("/hook")
            .header("x-github-delivery", "1")
            .header("x-hub-signature-256", WebhookSecret::new(SECRET).sign(&body))
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
