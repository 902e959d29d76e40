//! Response DTOs for the webhook HTTP surface.

use serde::{Deserialize, Serialize};

/// Body returned for every accepted event, including idempotent replays.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub success: bool,
}

impl WebhookAckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Structured error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Liveness probe body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
