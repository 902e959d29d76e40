//! Axum router configuration.
//!
//! Wires the webhook endpoint and the liveness probe, and applies the
//! request-wide middleware: request ids, tracing, and the per-request
//! timeout that bounds total processing time. A delivery cut off by the
//! timeout is safe to redeliver because processing is idempotent.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_revenuecat_webhook, health, method_not_allowed, AppState};

/// Create the webhook router.
///
/// Webhook routes carry no session authentication; each request is verified
/// against the provider's signature. Any method other than POST is answered
/// 405 without the body being read.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route(
        "/revenuecat",
        post(handle_revenuecat_webhook).fallback(method_not_allowed),
    )
}

/// Create the complete application router with middleware applied.
pub fn api_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/webhooks", webhook_routes())
        .route("/healthz", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
