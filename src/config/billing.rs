//! Billing provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Minimum length we accept for the webhook signing secret. Anything shorter
/// is almost certainly a placeholder left over from local setup.
const MIN_SECRET_LEN: usize = 16;

/// Billing configuration (RevenueCat)
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Shared secret used to sign webhook payloads (RevenueCat dashboard)
    pub webhook_secret: SecretString,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_WEBHOOK_SECRET"));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::WebhookSecretTooShort);
        }
        Ok(())
    }
}
