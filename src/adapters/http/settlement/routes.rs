//! Axum router configuration for settlement endpoints.
//!
//! This module defines the route structure for the webhook ingress and the
//! payout reporting API and wires them to their handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    export_payouts_csv, get_payout_performance, get_payout_summary, get_payout_trends,
    get_top_sellers, handle_provider_webhook, SettlementAppState,
};

/// Create the webhook ingress router.
///
/// Separate from the reporting routes because webhook requests carry no
/// user authentication; they are verified by signature.
///
/// # Routes
/// - `POST /payment-provider` - Ingest provider webhooks
pub fn webhook_routes() -> Router<SettlementAppState> {
    Router::new().route("/payment-provider", post(handle_provider_webhook))
}

/// Create the payout reporting router.
///
/// # Routes
/// - `GET /summary` - Totals by status
/// - `GET /top-sellers` - Sellers ranked by paid volume
/// - `GET /trends` - Monthly activity
/// - `GET /performance` - Transfer performance metrics
/// - `GET /export.csv` - Raw payout ledger export
pub fn payout_routes() -> Router<SettlementAppState> {
    Router::new()
        .route("/summary", get(get_payout_summary))
        .route("/top-sellers", get(get_top_sellers))
        .route("/trends", get(get_payout_trends))
        .route("/performance", get(get_payout_performance))
        .route("/export.csv", get(export_payouts_csv))
}

/// Create the complete settlement module router.
///
/// Mounts the webhook ingress at `/webhooks` and the reporting API at
/// `/api/payouts`.
pub fn settlement_router() -> Router<SettlementAppState> {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .nest("/api/payouts", payout_routes())
}
