//! AccountStore port - narrow interface into the persisted account record.
//!
//! The webhook core reads one account by its provider identifier and applies
//! field-level partial updates. It never replaces whole records, so writers
//! of unrelated account fields (profile edits, check-ins) are never
//! clobbered by a concurrent webhook.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::account::{Account, AccountUpdate};
use crate::domain::foundation::DomainError;

/// Port for reading and mutating member accounts.
///
/// `update` must be atomic per account. TRANSFER's two-account mutation is
/// issued as two sequential calls; cross-account atomicity is not required
/// of implementations.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by the billing provider's `app_user_id`.
    ///
    /// Returns `None` if no account maps to that identifier.
    async fn find_by_app_user_id(
        &self,
        app_user_id: &str,
    ) -> Result<Option<Account>, DomainError>;

    /// Apply a field-level partial update to one account.
    ///
    /// Fields the update leaves as `None` must not be written.
    async fn update(&self, account_id: Uuid, update: AccountUpdate) -> Result<(), DomainError>;
}
