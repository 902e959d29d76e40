//! PostgreSQL implementation of AccountStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::{Account, AccountStatus, AccountUpdate};
use crate::domain::foundation::DomainError;
use crate::ports::AccountStore;

/// PostgreSQL implementation of the AccountStore port.
///
/// Uses sqlx with connection pooling. Partial updates are expressed as a
/// single UPDATE statement where untouched columns keep their stored value,
/// so each call is atomic per account row.
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Creates a new PostgresAccountStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an account.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    app_user_id: String,
    status: String,
    subscription_id: Option<String>,
    product_id: Option<String>,
    last_payment_date: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
    auto_resume_date: Option<DateTime<Utc>>,
    grace_period_expires_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let status = AccountStatus::parse(&row.status).ok_or_else(|| {
            DomainError::Database(format!("Invalid status value: {}", row.status))
        })?;

        Ok(Account {
            id: row.id,
            app_user_id: row.app_user_id,
            status,
            subscription_id: row.subscription_id,
            product_id: row.product_id,
            last_payment_date: row.last_payment_date,
            expiration_date: row.expiration_date,
            auto_resume_date: row.auto_resume_date,
            grace_period_expires_date: row.grace_period_expires_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_by_app_user_id(
        &self,
        app_user_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, app_user_id, status, subscription_id, product_id,
                   last_payment_date, expiration_date, auto_resume_date,
                   grace_period_expires_date, created_at, updated_at
            FROM accounts
            WHERE app_user_id = $1
            "#,
        )
        .bind(app_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Database(format!("Failed to load account: {}", e)))?;

        row.map(Account::try_from).transpose()
    }

    async fn update(&self, account_id: Uuid, update: AccountUpdate) -> Result<(), DomainError> {
        if update.is_empty() {
            return Ok(());
        }

        // Each nullable column is guarded by a touch flag so `Some(None)`
        // can set NULL while `None` leaves the stored value alone.
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                status = COALESCE($2, status),
                subscription_id = CASE WHEN $3 THEN $4 ELSE subscription_id END,
                product_id = CASE WHEN $5 THEN $6 ELSE product_id END,
                last_payment_date = CASE WHEN $7 THEN $8 ELSE last_payment_date END,
                expiration_date = CASE WHEN $9 THEN $10 ELSE expiration_date END,
                auto_resume_date = CASE WHEN $11 THEN $12 ELSE auto_resume_date END,
                grace_period_expires_date = CASE WHEN $13 THEN $14 ELSE grace_period_expires_date END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.subscription_id.is_some())
        .bind(update.subscription_id.flatten())
        .bind(update.product_id.is_some())
        .bind(update.product_id.flatten())
        .bind(update.last_payment_date.is_some())
        .bind(update.last_payment_date.flatten())
        .bind(update.expiration_date.is_some())
        .bind(update.expiration_date.flatten())
        .bind(update.auto_resume_date.is_some())
        .bind(update.auto_resume_date.flatten())
        .bind(update.grace_period_expires_date.is_some())
        .bind(update.grace_period_expires_date.flatten())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(format!("Failed to update account: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("account", account_id.to_string()));
        }

        Ok(())
    }
}
