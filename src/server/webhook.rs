//! Webhook endpoint handler.
//!
//! Authenticates the delivery, decodes it and hands it to the dispatcher.
//! GitHub gets its answer as soon as the event is decoded; reconciliation
//! continues in the background.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::effects::GitHubInterpreter;
use crate::types::DeliveryId;
use crate::webhooks::{ParseError, SignatureError};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Body of every accepted delivery.
pub const ACCEPTED_BODY: &str = "Event received. Have a nice day.";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("malformed payload: {0}")]
    Malformed(#[from] ParseError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) | WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Webhook handler, mounted at `/` and `/hook`.
///
/// - 200: accepted (including event types the bot ignores)
/// - 400: missing header or malformed payload
/// - 401: missing or invalid signature
pub async fn webhook_handler<G: GitHubInterpreter + 'static>(
    State(app_state): State<AppState<G>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    // Authenticate before looking at anything else in the request.
    if let Err(e) = app_state
        .secret()
        .verify(&body, header(&headers, HEADER_SIGNATURE))
    {
        warn!(error = %e, "Rejected webhook delivery");
        return Err(e.into());
    }

    let event_type =
        header(&headers, HEADER_EVENT).ok_or(WebhookError::MissingHeader(HEADER_EVENT))?;
    let delivery = header(&headers, HEADER_DELIVERY)
        .map(DeliveryId::new)
        .ok_or(WebhookError::MissingHeader(HEADER_DELIVERY))?;

    debug!(event_type, delivery_id = %delivery, "Received webhook");

    match app_state.dispatcher().dispatch(event_type, &delivery, &body) {
        Ok(dispatched) => {
            debug!(event_type, delivery_id = %delivery, ?dispatched, "Webhook handled");
            Ok((StatusCode::OK, ACCEPTED_BODY))
        }
        Err(e) => {
            warn!(event_type, delivery_id = %delivery, error = %e, "Error parsing event");
            Err(e.into())
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
