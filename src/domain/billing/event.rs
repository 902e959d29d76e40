//! RevenueCat webhook event types.
//!
//! Defines the structures for parsing RevenueCat webhook payloads. Only
//! fields relevant to our processing are captured; everything else in the
//! provider's schema is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RevenueCat webhook event (simplified).
///
/// The provider delivers a flat event object; timestamps arrive as Unix
/// epoch milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEvent {
    /// Provider-assigned unique identifier; the idempotency key.
    pub id: String,

    /// Event type string (e.g. "INITIAL_PURCHASE").
    #[serde(rename = "type")]
    pub event_type: String,

    /// The provider's identifier for the affected account.
    ///
    /// Defaulted rather than required so that an absent field surfaces as a
    /// missing-user rejection (with an audit record) instead of a parse
    /// failure that cannot be keyed to anything.
    #[serde(default)]
    pub app_user_id: String,

    /// External subscription reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    /// Store product identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,

    /// Price paid, in the store's currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// When the entitlement expires (epoch ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_at_ms: Option<i64>,

    /// End of the billing-retry grace period (epoch ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_expiration_at_ms: Option<i64>,

    /// When a paused subscription will resume (epoch ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_resume_at_ms: Option<i64>,

    /// For TRANSFER events, the `app_user_id`s the subscription moved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transferred_from: Option<Vec<String>>,

    /// When the provider generated the event (epoch ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_timestamp_ms: Option<i64>,
}

impl WebhookEvent {
    /// Parse the event type into a known enum variant, if it is one.
    pub fn parsed_type(&self) -> Option<EventType> {
        EventType::parse(&self.event_type)
    }

    /// Entitlement expiration as a UTC timestamp.
    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_at_ms.and_then(ms_to_datetime)
    }

    /// Grace-period end as a UTC timestamp.
    pub fn grace_period_expires_date(&self) -> Option<DateTime<Utc>> {
        self.grace_period_expiration_at_ms.and_then(ms_to_datetime)
    }

    /// Auto-resume time as a UTC timestamp.
    pub fn auto_resume_date(&self) -> Option<DateTime<Utc>> {
        self.auto_resume_at_ms.and_then(ms_to_datetime)
    }

    /// First source account of a TRANSFER, if the event names one.
    pub fn transfer_source(&self) -> Option<&str> {
        self.transferred_from
            .as_deref()
            .and_then(|sources| sources.first())
            .map(String::as_str)
    }
}

fn ms_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Known RevenueCat event types.
///
/// Dispatch happens through an exhaustive `match` on this enum; any string
/// outside the set is rejected before reaching the transition logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// First purchase of a subscription.
    InitialPurchase,
    /// Successful renewal payment.
    Renewal,
    /// User cancelled auto-renewal.
    Cancellation,
    /// User re-enabled auto-renewal before expiry.
    Uncancellation,
    /// Subscription paused via the store.
    SubscriptionPaused,
    /// Provider extended the entitlement window.
    SubscriptionExtended,
    /// Renewal payment failed; grace period begins.
    BillingIssue,
    /// User switched to a different product.
    ProductChange,
    /// Entitlement lapsed.
    Expiration,
    /// Subscription moved between provider identities.
    Transfer,
    /// Dashboard-issued test event.
    Test,
}

impl EventType {
    /// Parse an event type from the provider's string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INITIAL_PURCHASE" => Some(Self::InitialPurchase),
            "RENEWAL" => Some(Self::Renewal),
            "CANCELLATION" => Some(Self::Cancellation),
            "UNCANCELLATION" => Some(Self::Uncancellation),
            "SUBSCRIPTION_PAUSED" => Some(Self::SubscriptionPaused),
            "SUBSCRIPTION_EXTENDED" => Some(Self::SubscriptionExtended),
            "BILLING_ISSUE" => Some(Self::BillingIssue),
            "PRODUCT_CHANGE" => Some(Self::ProductChange),
            "EXPIRATION" => Some(Self::Expiration),
            "TRANSFER" => Some(Self::Transfer),
            "TEST" => Some(Self::Test),
            _ => None,
        }
    }

    /// The provider's string form of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialPurchase => "INITIAL_PURCHASE",
            Self::Renewal => "RENEWAL",
            Self::Cancellation => "CANCELLATION",
            Self::Uncancellation => "UNCANCELLATION",
            Self::SubscriptionPaused => "SUBSCRIPTION_PAUSED",
            Self::SubscriptionExtended => "SUBSCRIPTION_EXTENDED",
            Self::BillingIssue => "BILLING_ISSUE",
            Self::ProductChange => "PRODUCT_CHANGE",
            Self::Expiration => "EXPIRATION",
            Self::Transfer => "TRANSFER",
            Self::Test => "TEST",
        }
    }

    /// All known event types.
    pub const ALL: [EventType; 11] = [
        Self::InitialPurchase,
        Self::Renewal,
        Self::Cancellation,
        Self::Uncancellation,
        Self::SubscriptionPaused,
        Self::SubscriptionExtended,
        Self::BillingIssue,
        Self::ProductChange,
        Self::Expiration,
        Self::Transfer,
        Self::Test,
    ];
}

/// Builder for creating test WebhookEvent instances.
#[cfg(test)]
pub struct WebhookEventBuilder {
    id: String,
    event_type: String,
    app_user_id: String,
    subscription_id: Option<String>,
    product_id: Option<String>,
    expiration_at_ms: Option<i64>,
    grace_period_expiration_at_ms: Option<i64>,
    auto_resume_at_ms: Option<i64>,
    transferred_from: Option<Vec<String>>,
}

#[cfg(test)]
impl Default for WebhookEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "INITIAL_PURCHASE".to_string(),
            app_user_id: "user-123".to_string(),
            subscription_id: Some("sub_123".to_string()),
            product_id: Some("clubtrack.monthly".to_string()),
            expiration_at_ms: None,
            grace_period_expiration_at_ms: None,
            auto_resume_at_ms: None,
            transferred_from: None,
        }
    }
}

#[cfg(test)]
impl WebhookEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn app_user_id(mut self, app_user_id: impl Into<String>) -> Self {
        self.app_user_id = app_user_id.into();
        self
    }

    pub fn subscription_id(mut self, subscription_id: Option<String>) -> Self {
        self.subscription_id = subscription_id;
        self
    }

    pub fn product_id(mut self, product_id: Option<String>) -> Self {
        self.product_id = product_id;
        self
    }

    pub fn expiration_at_ms(mut self, ms: i64) -> Self {
        self.expiration_at_ms = Some(ms);
        self
    }

    pub fn grace_period_expiration_at_ms(mut self, ms: i64) -> Self {
        self.grace_period_expiration_at_ms = Some(ms);
        self
    }

    pub fn auto_resume_at_ms(mut self, ms: i64) -> Self {
        self.auto_resume_at_ms = Some(ms);
        self
    }

    pub fn transferred_from(mut self, sources: Vec<&str>) -> Self {
        self.transferred_from = Some(sources.into_iter().map(String::from).collect());
        self
    }

    pub fn build(self) -> WebhookEvent {
        WebhookEvent {
            id: self.id,
            event_type: self.event_type,
            app_user_id: self.app_user_id,
            subscription_id: self.subscription_id,
            product_id: self.product_id,
            price: None,
            expiration_at_ms: self.expiration_at_ms,
            grace_period_expiration_at_ms: self.grace_period_expiration_at_ms,
            auto_resume_at_ms: self.auto_resume_at_ms,
            transferred_from: self.transferred_from,
            event_timestamp_ms: Some(1_704_067_200_000),
        }
    }
}
