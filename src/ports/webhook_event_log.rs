//! WebhookEventLog port - the durable dedupe and audit record.
//!
//! One row per provider event id. The log serves two purposes at once: it is
//! the idempotency barrier that keeps redelivered events from being applied
//! twice, and the audit trail operations uses to triage webhook failures.
//!
//! ## Why idempotency matters
//!
//! The provider delivers at-least-once: network timeouts, 5xx responses, and
//! lost acknowledgments all trigger redelivery. The insert must therefore be
//! atomic insert-or-exists (unique-constraint semantics), never a
//! read-then-write check, so two concurrent deliveries of the same event id
//! cannot both record an application.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;

/// Durable record of one received, signature-valid webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventLogEntry {
    /// Provider event id; unique key.
    pub event_id: String,

    /// Provider event type string as received.
    pub event_type: String,

    /// The `app_user_id` the event targeted (may be blank for rejected
    /// events that carried none).
    pub app_user_id: String,

    /// Whether the transition was applied.
    pub success: bool,

    /// Failure description when `success` is false.
    pub error_message: Option<String>,

    /// Verbatim event payload, for debugging and compliance.
    pub payload: serde_json::Value,

    /// When this entry was written.
    pub received_at: DateTime<Utc>,
}

impl WebhookEventLogEntry {
    /// Creates an entry for a successfully applied event.
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        app_user_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            app_user_id: app_user_id.into(),
            success: true,
            error_message: None,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Creates an entry for an event whose transition failed.
    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        app_user_id: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            app_user_id: app_user_id.into(),
            success: false,
            error_message: Some(error.into()),
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Result of attempting to record an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The entry was written (first outcome for this event id, or it
    /// superseded a prior failed attempt).
    Recorded,
    /// A successful entry already exists; the event must not be re-applied.
    AlreadyProcessed,
}

/// Port for the durable webhook event log.
///
/// Implementations must back `record` with a unique constraint on
/// `event_id`. A stored `success = true` entry is immutable; a stored
/// `success = false` entry is superseded in place by the next attempt's
/// outcome, which is what makes transient failures retryable while keeping
/// at most one entry per event id.
#[async_trait]
pub trait WebhookEventLog: Send + Sync {
    /// Find a previously recorded event by its provider event id.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventLogEntry>, DomainError>;

    /// Atomically record the outcome of processing an event.
    async fn record(&self, entry: WebhookEventLogEntry) -> Result<InsertOutcome, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory implementation mirroring the conflict semantics of the
    /// Postgres adapter.
    struct InMemoryWebhookEventLog {
        entries: Arc<RwLock<HashMap<String, WebhookEventLogEntry>>>,
    }

    impl InMemoryWebhookEventLog {
        fn new() -> Self {
            Self {
                entries: Arc::new(RwLock::new(HashMap::new())),
            }
        }
    }

    #[async_trait]
    impl WebhookEventLog for InMemoryWebhookEventLog {
        async fn find_by_event_id(
            &self,
            event_id: &str,
        ) -> Result<Option<WebhookEventLogEntry>, DomainError> {
            Ok(self.entries.read().await.get(event_id).cloned())
        }

        async fn record(
            &self,
            entry: WebhookEventLogEntry,
        ) -> Result<InsertOutcome, DomainError> {
            let mut entries = self.entries.write().await;
            match entries.get(&entry.event_id) {
                Some(existing) if existing.success => Ok(InsertOutcome::AlreadyProcessed),
                _ => {
                    entries.insert(entry.event_id.clone(), entry);
                    Ok(InsertOutcome::Recorded)
                }
            }
        }
    }

    fn success_entry(event_id: &str) -> WebhookEventLogEntry {
        WebhookEventLogEntry::success(event_id, "RENEWAL", "user-1", serde_json::json!({}))
    }

    fn failed_entry(event_id: &str, error: &str) -> WebhookEventLogEntry {
        WebhookEventLogEntry::failed(event_id, "RENEWAL", "user-1", error, serde_json::json!({}))
    }

    // ══════════════════════════════════════════════════════════════
    // Entry constructor tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn success_entry_has_no_error_message() {
        let entry = success_entry("evt_1");
        assert!(entry.success);
        assert!(entry.error_message.is_none());
    }

    #[test]
    fn failed_entry_carries_error_message() {
        let entry = failed_entry("evt_2", "Account not found for user u");
        assert!(!entry.success);
        assert_eq!(
            entry.error_message.as_deref(),
            Some("Account not found for user u")
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Port contract tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn find_returns_none_for_new_event() {
        let log = InMemoryWebhookEventLog::new();

        assert!(log.find_by_event_id("evt_new").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_returns_recorded_for_new_event() {
        let log = InMemoryWebhookEventLog::new();

        let outcome = log.record(success_entry("evt_first")).await.unwrap();

        assert_eq!(outcome, InsertOutcome::Recorded);
        assert!(log.find_by_event_id("evt_first").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn record_refuses_to_overwrite_success() {
        let log = InMemoryWebhookEventLog::new();
        log.record(success_entry("evt_dup")).await.unwrap();

        let outcome = log.record(success_entry("evt_dup")).await.unwrap();

        assert_eq!(outcome, InsertOutcome::AlreadyProcessed);
    }

    #[tokio::test]
    async fn record_supersedes_prior_failure() {
        let log = InMemoryWebhookEventLog::new();
        log.record(failed_entry("evt_retry", "Event store unavailable: timeout"))
            .await
            .unwrap();

        let outcome = log.record(success_entry("evt_retry")).await.unwrap();

        assert_eq!(outcome, InsertOutcome::Recorded);
        let stored = log.find_by_event_id("evt_retry").await.unwrap().unwrap();
        assert!(stored.success);
        assert!(stored.error_message.is_none());
    }

    #[tokio::test]
    async fn different_events_stored_separately() {
        let log = InMemoryWebhookEventLog::new();
        log.record(success_entry("evt_1")).await.unwrap();
        log.record(failed_entry("evt_2", "boom")).await.unwrap();

        assert!(log.find_by_event_id("evt_1").await.unwrap().unwrap().success);
        assert!(!log.find_by_event_id("evt_2").await.unwrap().unwrap().success);
    }
}
