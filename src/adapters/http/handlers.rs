//! HTTP handlers for the webhook endpoints.
//!
//! The webhook route takes no user authentication; requests are
//! authenticated by signature inside the processing handler, which needs the
//! raw body bytes exactly as sent.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::application::ProcessWebhookHandler;
use crate::domain::billing::WebhookError;

use super::dto::{ErrorResponse, HealthResponse, WebhookAckResponse};

/// Header carrying the provider's hex HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "X-RevenueCat-Signature";

/// Shared application state containing all dependencies.
///
/// Cloned per request; the handler itself is shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub webhook_handler: Arc<ProcessWebhookHandler>,
}

/// POST /api/webhooks/revenuecat - Handle RevenueCat webhook events
pub async fn handle_revenuecat_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    state.webhook_handler.process(&body, signature).await?;

    // Replays acknowledge with the same body as first applications so the
    // provider stops redelivering either way.
    Ok((StatusCode::OK, Json(WebhookAckResponse::ok())))
}

/// Fallback for non-POST methods on the webhook route. The body is never
/// read.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
}

/// GET /healthz - liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// API error type that converts webhook errors to HTTP responses.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let body = ErrorResponse::new(self.0.to_string());
        (status, Json(body)).into_response()
    }
}
