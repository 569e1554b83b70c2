//! Vendora settlement server entry point.
//!
//! Starts the Axum HTTP server hosting the webhook ingress and the payout
//! reporting API.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vendora::adapters::http::settlement::{settlement_router, SettlementAppState};
use vendora::adapters::postgres::{
    PostgresOrderRepository, PostgresPayoutReader, PostgresPayoutRepository,
    PostgresProcessedEventStore,
};
use vendora::adapters::stripe::{StripeWebhookConfig, StripeWebhookVerifier};
use vendora::config::AppConfig;
use vendora::domain::settlement::CommissionCalculator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load and validate configuration before anything else: a missing
    // webhook secret must stop the process here, never degrade to an
    // unsigned webhook path.
    let config = AppConfig::load()?;
    config.validate()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, environment = ?config.server.environment, "starting vendora settlement service");

    // Connect to PostgreSQL with bounded acquire timeout; every datastore
    // call in the webhook path rides on this bound.
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Build adapters
    let verifier = StripeWebhookVerifier::new(
        StripeWebhookConfig::new(config.payment.webhook_secret.clone())
            .with_require_livemode(config.payment.require_livemode),
    );
    let payout_repository = Arc::new(PostgresPayoutRepository::new(pool.clone()));

    let app_state = SettlementAppState {
        webhook_verifier: Arc::new(verifier),
        processed_events: Arc::new(PostgresProcessedEventStore::new(pool.clone())),
        order_repository: Arc::new(PostgresOrderRepository::new(pool.clone())),
        payout_repository,
        payout_reader: Arc::new(PostgresPayoutReader::new(pool)),
        commission: CommissionCalculator::new(config.payment.commission_rate_bps),
    };

    // Build router
    let app = settlement_router()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
