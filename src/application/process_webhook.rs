//! Webhook processing orchestration.
//!
//! Drives one request through the full pipeline: authenticate the raw body,
//! parse, dedupe, compute the lifecycle transition, apply it through the
//! account store, and record the outcome. Idempotency rests on the event
//! log: a `success = true` entry short-circuits before any mutation, and the
//! log's atomic insert decides the winner when the same event id races.
//!
//! No ordering is enforced across distinct events for the same account; the
//! provider may redeliver out of order and each event applies against the
//! currently stored status.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::account::Account;
use crate::domain::billing::{self, SignatureVerifier, Transition, WebhookError, WebhookEvent};
use crate::ports::{AccountStore, InsertOutcome, WebhookEventLog};

use super::audit::AuditLogger;

/// Result of processing one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The transition was applied to the account(s).
    Applied,
    /// The event had already been applied; nothing was re-mutated.
    Replayed,
}

/// Handler for inbound billing webhooks.
///
/// Constructed once at startup with the signing secret and store adapters;
/// shared across requests behind an `Arc`.
pub struct ProcessWebhookHandler {
    verifier: SignatureVerifier,
    accounts: Arc<dyn AccountStore>,
    event_log: Arc<dyn WebhookEventLog>,
    audit: AuditLogger,
}

impl ProcessWebhookHandler {
    pub fn new(
        verifier: SignatureVerifier,
        accounts: Arc<dyn AccountStore>,
        event_log: Arc<dyn WebhookEventLog>,
    ) -> Self {
        let audit = AuditLogger::new(event_log.clone());
        Self {
            verifier,
            accounts,
            event_log,
            audit,
        }
    }

    /// Processes one delivery: raw body bytes plus the signature header, if
    /// the request carried one.
    ///
    /// # Errors
    ///
    /// Every failure surfaces as a [`WebhookError`]; failures past signature
    /// verification and parsing are also recorded in the event log with
    /// `success = false`.
    pub async fn process(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookError> {
        // Authentication runs on the raw bytes, before any parsing. An
        // unauthenticated request has no trusted identity and is never
        // written to the event log.
        let authentic = signature_header
            .map(|header| self.verifier.verify(raw_body, header))
            .unwrap_or(false);
        if !authentic {
            return Err(WebhookError::InvalidSignature);
        }

        // Keep the verbatim payload for the audit record.
        let payload: serde_json::Value = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let event: WebhookEvent = serde_json::from_value(payload.clone())
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        // Idempotency check. A prior failed attempt is retried; a prior
        // success is acknowledged without re-applying.
        if let Some(entry) = self.event_log.find_by_event_id(&event.id).await? {
            if entry.success {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "duplicate webhook delivery, already applied"
                );
                return Ok(WebhookOutcome::Replayed);
            }
        }

        if event.app_user_id.trim().is_empty() {
            return self
                .reject(&event, &payload, WebhookError::MissingSubjectId)
                .await;
        }

        let account = match self.accounts.find_by_app_user_id(&event.app_user_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                let err = WebhookError::AccountNotFound(event.app_user_id.clone());
                return self.reject(&event, &payload, err).await;
            }
            Err(e) => return self.reject(&event, &payload, e.into()).await,
        };

        let transition = match billing::apply(&event, &account, Utc::now()) {
            Ok(transition) => transition,
            Err(err) => return self.reject(&event, &payload, err).await,
        };

        if let Err(err) = self.apply_transition(&account, transition).await {
            return self.reject(&event, &payload, err).await;
        }

        match self.audit.record_success(&event, &payload).await? {
            InsertOutcome::Recorded => Ok(WebhookOutcome::Applied),
            // Lost the insert race against a concurrent delivery of the
            // same event id.
            InsertOutcome::AlreadyProcessed => Ok(WebhookOutcome::Replayed),
        }
    }

    /// Applies a computed transition through the account store.
    async fn apply_transition(
        &self,
        account: &Account,
        transition: Transition,
    ) -> Result<(), WebhookError> {
        match transition {
            Transition::NoOp => Ok(()),
            Transition::Update(update) => {
                self.accounts.update(account.id, update).await?;
                Ok(())
            }
            Transition::Transfer { source, target } => {
                if let Some((source_user, source_update)) = source {
                    // A store error here fails closed: the target must not
                    // be activated if we cannot establish the source's fate.
                    match self.accounts.find_by_app_user_id(&source_user).await {
                        Ok(Some(source_account)) => {
                            self.accounts
                                .update(source_account.id, source_update)
                                .await?;
                        }
                        Ok(None) => {
                            tracing::warn!(
                                source_app_user_id = %source_user,
                                target_app_user_id = %account.app_user_id,
                                "transfer source account not found, activating target only"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                self.accounts.update(account.id, target).await?;
                Ok(())
            }
        }
    }

    /// Records a failed event and propagates the error.
    async fn reject(
        &self,
        event: &WebhookEvent,
        payload: &serde_json::Value,
        err: WebhookError,
    ) -> Result<WebhookOutcome, WebhookError> {
        if let Err(audit_err) = self.audit.record_failure(event, payload, &err).await {
            tracing::error!(
                event_id = %event.id,
                error = %audit_err,
                "failed to record rejected webhook event"
            );
        }
        Err(err)
    }
}
