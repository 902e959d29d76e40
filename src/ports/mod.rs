//! Ports - async trait boundaries between the domain and infrastructure.

mod account_store;
mod webhook_event_log;

pub use account_store::AccountStore;
pub use webhook_event_log::{InsertOutcome, WebhookEventLog, WebhookEventLogEntry};
