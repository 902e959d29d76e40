//! Audit logging for webhook processing.
//!
//! Exactly one durable record is written per signature-valid event,
//! whether or not the transition was applied. The durable write is the only
//! thing on the critical path; the structured `tracing` events emitted here
//! are a fire-and-forget side channel for operational triage.

use std::sync::Arc;

use crate::domain::billing::{WebhookError, WebhookEvent};
use crate::domain::foundation::DomainError;
use crate::ports::{InsertOutcome, WebhookEventLog, WebhookEventLogEntry};

/// Records webhook processing outcomes to the durable event log.
pub struct AuditLogger {
    log: Arc<dyn WebhookEventLog>,
}

impl AuditLogger {
    /// Creates an audit logger over the given event log.
    pub fn new(log: Arc<dyn WebhookEventLog>) -> Self {
        Self { log }
    }

    /// Records a successfully applied event.
    ///
    /// Returns `AlreadyProcessed` when a concurrent delivery of the same
    /// event id recorded success first.
    pub async fn record_success(
        &self,
        event: &WebhookEvent,
        payload: &serde_json::Value,
    ) -> Result<InsertOutcome, DomainError> {
        let entry = WebhookEventLogEntry::success(
            &event.id,
            &event.event_type,
            &event.app_user_id,
            payload.clone(),
        );
        let outcome = self.log.record(entry).await?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            app_user_id = %event.app_user_id,
            outcome = ?outcome,
            "webhook event applied"
        );

        Ok(outcome)
    }

    /// Records an event whose transition failed.
    pub async fn record_failure(
        &self,
        event: &WebhookEvent,
        payload: &serde_json::Value,
        error: &WebhookError,
    ) -> Result<InsertOutcome, DomainError> {
        let entry = WebhookEventLogEntry::failed(
            &event.id,
            &event.event_type,
            &event.app_user_id,
            error.to_string(),
            payload.clone(),
        );
        let outcome = self.log.record(entry).await?;

        tracing::warn!(
            event_id = %event.id,
            event_type = %event.event_type,
            app_user_id = %event.app_user_id,
            error = %error,
            retryable = error.is_retryable(),
            "webhook event rejected"
        );

        Ok(outcome)
    }
}
