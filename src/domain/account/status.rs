//! Account status lifecycle.
//!
//! Defines the closed set of billing states an account can be in. Unlike an
//! internally driven state machine, transitions here are dictated by the
//! billing provider's event feed: each webhook event maps onto a target
//! status regardless of the current one, because the provider may redeliver
//! events out of order and remains the source of truth for the subscription.

use serde::{Deserialize, Serialize};

/// Billing status of a member account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Evaluating the app; no purchase yet.
    Trial,

    /// Paid subscription in good standing.
    Active,

    /// Complimentary access granted outside the billing provider.
    ActiveFree,

    /// User cancelled; access continues until the paid period ends.
    Canceled,

    /// Subscription paused by the user; resumes automatically.
    Paused,

    /// Payment failed; inside the provider's grace period.
    PastDue,

    /// Subscription lapsed. No access until repurchase.
    Frozen,

    /// Account was soft-deleted. Terminal; no event may resurrect it.
    Deleted,
}

impl AccountStatus {
    /// Returns true if this status grants access to the app.
    ///
    /// `Canceled` retains access until the period end is reached; `PastDue`
    /// retains access for the duration of the grace period.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            AccountStatus::Trial
                | AccountStatus::Active
                | AccountStatus::ActiveFree
                | AccountStatus::Canceled
                | AccountStatus::Paused
                | AccountStatus::PastDue
        )
    }

    /// Returns true if no webhook event may move the account out of this
    /// status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AccountStatus::Deleted)
    }

    /// Parse a status from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trial" => Some(Self::Trial),
            "active" => Some(Self::Active),
            "active_free" => Some(Self::ActiveFree),
            "canceled" => Some(Self::Canceled),
            "paused" => Some(Self::Paused),
            "past_due" => Some(Self::PastDue),
            "frozen" => Some(Self::Frozen),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// The stored string form of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::ActiveFree => "active_free",
            Self::Canceled => "canceled",
            Self::Paused => "paused",
            Self::PastDue => "past_due",
            Self::Frozen => "frozen",
            Self::Deleted => "deleted",
        }
    }
}
