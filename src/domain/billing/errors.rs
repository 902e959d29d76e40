//! Webhook error taxonomy.
//!
//! Every failure mode of webhook processing, with HTTP status mapping and
//! retryability semantics. The provider redelivers on 5xx, so the status a
//! variant maps to is part of the contract, not cosmetics.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// Signature verification failed; the request is not from the provider.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body could not be parsed into a webhook event.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Event carried no usable account identifier.
    #[error("Missing user_id in webhook event")]
    MissingSubjectId,

    /// Event type outside the known lifecycle set.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// No account matches the event's `app_user_id`.
    #[error("Account not found for user {0}")]
    AccountNotFound(String),

    /// The account or event store could not complete a write or read.
    #[error("Event store unavailable: {0}")]
    StoreUnavailable(String),

    /// Other infrastructure failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this event.
    ///
    /// Only transient infrastructure failures are retryable; everything
    /// else will fail identically on every redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::StoreUnavailable(_) | WebhookError::Database(_)
        )
    }

    /// Returns true if the failure happened before the event's identity was
    /// authenticated, in which case nothing may be written to the event log.
    pub fn precedes_audit(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature | WebhookError::MalformedPayload(_)
        )
    }

    /// Maps the error to the HTTP status the provider sees.
    ///
    /// - 401: authentication failure, never retried
    /// - 400: unparseable input, never retried
    /// - 500: business or infrastructure failure; the provider retries,
    ///   and the dedupe log decides whether a retry is applied
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::MissingSubjectId
            | WebhookError::UnknownEventType(_)
            | WebhookError::AccountNotFound(_)
            | WebhookError::StoreUnavailable(_)
            | WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Database(cause) => WebhookError::StoreUnavailable(cause),
            other => WebhookError::Database(other.to_string()),
        }
    }
}
