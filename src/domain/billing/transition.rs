//! Lifecycle transition logic.
//!
//! Maps a webhook event onto the account mutation it implies. This is the
//! synchronous, side-effect-free core of webhook processing: it computes
//! *what* should change and leaves *applying* the change to the store
//! adapters.
//!
//! Transitions are provider-driven. Each event is applied against whatever
//! status is currently stored; there is no timestamp ordering guard, so a
//! stale RENEWAL delivered after a CANCELLATION will still refresh
//! `last_payment_date`. That mirrors the provider's delivery contract rather
//! than correcting it.

use chrono::{DateTime, Utc};

use crate::domain::account::{Account, AccountStatus, AccountUpdate};

use super::errors::WebhookError;
use super::event::{EventType, WebhookEvent};

/// The mutation a webhook event resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Event is acknowledged and audited but touches no account
    /// (TEST events, events against a terminal account).
    NoOp,

    /// Single-account field update.
    Update(AccountUpdate),

    /// Two-account mutation: the subscription moves from `source` to the
    /// event's subject. `source` is `None` when the event names no origin,
    /// in which case only the target is activated.
    Transfer {
        source: Option<(String, AccountUpdate)>,
        target: AccountUpdate,
    },
}

/// Computes the transition for an event against the current account state.
///
/// `now` is passed in so the computation stays deterministic under test.
///
/// # Errors
///
/// Returns `WebhookError::UnknownEventType` for any event type outside the
/// known lifecycle set.
pub fn apply(
    event: &WebhookEvent,
    account: &Account,
    now: DateTime<Utc>,
) -> Result<Transition, WebhookError> {
    let event_type = event
        .parsed_type()
        .ok_or_else(|| WebhookError::UnknownEventType(event.event_type.clone()))?;

    // Terminal accounts accept events without mutation so that delayed
    // deliveries cannot resurrect a soft-deleted account.
    if account.status.is_terminal() {
        return Ok(Transition::NoOp);
    }

    let transition = match event_type {
        EventType::InitialPurchase => Transition::Update(
            AccountUpdate::none()
                .with_status(AccountStatus::Active)
                .with_subscription_id(event.subscription_id.clone())
                .with_product_id(event.product_id.clone())
                .with_last_payment_date(now),
        ),
        EventType::Renewal => {
            Transition::Update(AccountUpdate::none().with_last_payment_date(now))
        }
        EventType::Cancellation => {
            Transition::Update(AccountUpdate::none().with_status(AccountStatus::Canceled))
        }
        EventType::Uncancellation => {
            Transition::Update(AccountUpdate::none().with_status(AccountStatus::Active))
        }
        EventType::SubscriptionPaused => Transition::Update(
            AccountUpdate::none()
                .with_status(AccountStatus::Paused)
                .with_auto_resume_date(event.auto_resume_date()),
        ),
        EventType::SubscriptionExtended => Transition::Update(
            AccountUpdate::none()
                .with_status(AccountStatus::Active)
                .with_expiration_date(event.expiration_date()),
        ),
        EventType::BillingIssue => Transition::Update(
            AccountUpdate::none()
                .with_status(AccountStatus::PastDue)
                .with_grace_period_expires_date(event.grace_period_expires_date()),
        ),
        EventType::ProductChange => {
            Transition::Update(AccountUpdate::none().with_product_id(event.product_id.clone()))
        }
        EventType::Expiration => {
            Transition::Update(AccountUpdate::none().with_status(AccountStatus::Frozen))
        }
        EventType::Transfer => Transition::Transfer {
            source: event.transfer_source().map(|app_user_id| {
                (
                    app_user_id.to_string(),
                    AccountUpdate::none()
                        .with_status(AccountStatus::Frozen)
                        .with_subscription_id(None),
                )
            }),
            target: AccountUpdate::none()
                .with_status(AccountStatus::Active)
                .with_subscription_id(event.subscription_id.clone()),
        },
        EventType::Test => Transition::NoOp,
    };

    Ok(transition)
}
