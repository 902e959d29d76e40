//! PostgreSQL adapter implementations of the persistence ports.

mod account_store;
mod webhook_event_log;

pub use account_store::PostgresAccountStore;
pub use webhook_event_log::PostgresWebhookEventLog;
