//! ClubTrack billing service entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use clubtrack::adapters::http::{api_router, AppState};
use clubtrack::adapters::postgres::{PostgresAccountStore, PostgresWebhookEventLog};
use clubtrack::application::ProcessWebhookHandler;
use clubtrack::config::AppConfig;
use clubtrack::domain::billing::SignatureVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let verifier = SignatureVerifier::new(config.billing.webhook_secret.clone());
    let accounts = Arc::new(PostgresAccountStore::new(pool.clone()));
    let event_log = Arc::new(PostgresWebhookEventLog::new(pool));
    let webhook_handler = Arc::new(ProcessWebhookHandler::new(verifier, accounts, event_log));

    let state = AppState { webhook_handler };
    let request_timeout = std::time::Duration::from_secs(config.server.request_timeout_secs);
    let app = api_router(state, request_timeout);

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "starting webhook server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
