//! Account aggregate (billing subset).
//!
//! Only the fields the webhook core reads and writes are modeled here. The
//! rest of the member record (profile, check-ins, contacts) belongs to other
//! services and is never touched by this crate.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::status::AccountStatus;

/// A member account as seen by the billing core.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Internal account id.
    pub id: Uuid,

    /// The billing provider's identifier for this account (`app_user_id`).
    pub app_user_id: String,

    /// Current billing status.
    pub status: AccountStatus,

    /// External subscription reference, if any.
    pub subscription_id: Option<String>,

    /// Store product backing the subscription, if any.
    pub product_id: Option<String>,

    /// When the last successful payment was observed.
    pub last_payment_date: Option<DateTime<Utc>>,

    /// When the current entitlement expires.
    pub expiration_date: Option<DateTime<Utc>>,

    /// When a paused subscription will resume.
    pub auto_resume_date: Option<DateTime<Utc>>,

    /// End of the billing-retry grace period, if in one.
    pub grace_period_expires_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field-level partial update of an [`Account`].
///
/// Outer `None` leaves the column untouched; for nullable columns,
/// `Some(None)` explicitly sets NULL. Updates are applied as a single atomic
/// UPDATE per account so concurrent writers touching unrelated fields are
/// never clobbered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountUpdate {
    pub status: Option<AccountStatus>,
    pub subscription_id: Option<Option<String>>,
    pub product_id: Option<Option<String>>,
    pub last_payment_date: Option<Option<DateTime<Utc>>>,
    pub expiration_date: Option<Option<DateTime<Utc>>>,
    pub auto_resume_date: Option<Option<DateTime<Utc>>>,
    pub grace_period_expires_date: Option<Option<DateTime<Utc>>>,
}

impl AccountUpdate {
    /// An update that touches nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true if no field would be modified.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_subscription_id(mut self, subscription_id: Option<String>) -> Self {
        self.subscription_id = Some(subscription_id);
        self
    }

    pub fn with_product_id(mut self, product_id: Option<String>) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_last_payment_date(mut self, at: DateTime<Utc>) -> Self {
        self.last_payment_date = Some(Some(at));
        self
    }

    pub fn with_expiration_date(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.expiration_date = Some(at);
        self
    }

    pub fn with_auto_resume_date(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.auto_resume_date = Some(at);
        self
    }

    pub fn with_grace_period_expires_date(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.grace_period_expires_date = Some(at);
        self
    }

    /// Applies this update to an in-memory account. Used by the in-memory
    /// store in tests; the Postgres adapter applies the same semantics in SQL.
    pub fn apply_to(&self, account: &mut Account, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            account.status = status;
        }
        if let Some(subscription_id) = &self.subscription_id {
            account.subscription_id = subscription_id.clone();
        }
        if let Some(product_id) = &self.product_id {
            account.product_id = product_id.clone();
        }
        if let Some(last_payment_date) = self.last_payment_date {
            account.last_payment_date = last_payment_date;
        }
        if let Some(expiration_date) = self.expiration_date {
            account.expiration_date = expiration_date;
        }
        if let Some(auto_resume_date) = self.auto_resume_date {
            account.auto_resume_date = auto_resume_date;
        }
        if let Some(grace_period_expires_date) = self.grace_period_expires_date {
            account.grace_period_expires_date = grace_period_expires_date;
        }
        account.updated_at = now;
    }
}

/// Builder for test accounts.
#[cfg(test)]
pub struct AccountBuilder {
    app_user_id: String,
    status: AccountStatus,
    subscription_id: Option<String>,
}

#[cfg(test)]
impl AccountBuilder {
    pub fn new(app_user_id: impl Into<String>) -> Self {
        Self {
            app_user_id: app_user_id.into(),
            status: AccountStatus::Trial,
            subscription_id: None,
        }
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn build(self) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            app_user_id: self.app_user_id,
            status: self.status,
            subscription_id: self.subscription_id,
            product_id: None,
            last_payment_date: None,
            expiration_date: None,
            auto_resume_date: None,
            grace_period_expires_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}
