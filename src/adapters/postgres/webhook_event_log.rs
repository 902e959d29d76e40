//! PostgreSQL implementation of WebhookEventLog.
//!
//! The `webhook_events` table uses the provider event id as its primary key.
//! The conditional upsert below is what closes the race between concurrent
//! deliveries of the same event: the first writer's success row wins, later
//! writers observe zero affected rows, and only rows recording a failed
//! attempt can be superseded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::{InsertOutcome, WebhookEventLog, WebhookEventLogEntry};

/// PostgreSQL implementation of the WebhookEventLog port.
pub struct PostgresWebhookEventLog {
    pool: PgPool,
}

impl PostgresWebhookEventLog {
    /// Creates a new PostgresWebhookEventLog with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a webhook event log entry.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    app_user_id: String,
    success: bool,
    error_message: Option<String>,
    payload: serde_json::Value,
    received_at: DateTime<Utc>,
}

impl From<WebhookEventRow> for WebhookEventLogEntry {
    fn from(row: WebhookEventRow) -> Self {
        WebhookEventLogEntry {
            event_id: row.event_id,
            event_type: row.event_type,
            app_user_id: row.app_user_id,
            success: row.success,
            error_message: row.error_message,
            payload: row.payload,
            received_at: row.received_at,
        }
    }
}

#[async_trait]
impl WebhookEventLog for PostgresWebhookEventLog {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventLogEntry>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, app_user_id, success, error_message,
                   payload, received_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Database(format!("Failed to load webhook event: {}", e)))?;

        Ok(row.map(WebhookEventLogEntry::from))
    }

    async fn record(&self, entry: WebhookEventLogEntry) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, app_user_id, success, error_message,
                payload, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_id) DO UPDATE SET
                event_type = EXCLUDED.event_type,
                app_user_id = EXCLUDED.app_user_id,
                success = EXCLUDED.success,
                error_message = EXCLUDED.error_message,
                payload = EXCLUDED.payload,
                received_at = EXCLUDED.received_at
            WHERE webhook_events.success = FALSE
            "#,
        )
        .bind(&entry.event_id)
        .bind(&entry.event_type)
        .bind(&entry.app_user_id)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(&entry.payload)
        .bind(entry.received_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(format!("Failed to record webhook event: {}", e)))?;

        if result.rows_affected() == 0 {
            // A success row already exists; it is immutable.
            Ok(InsertOutcome::AlreadyProcessed)
        } else {
            Ok(InsertOutcome::Recorded)
        }
    }
}
