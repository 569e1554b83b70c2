//! HTTP handlers for the settlement endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::application::handlers::reporting::{
    ExportPayoutsHandler, GetPayoutPerformanceHandler, GetPayoutPerformanceQuery,
    GetPayoutSummaryHandler, GetPayoutSummaryQuery, GetPayoutTrendsHandler, GetPayoutTrendsQuery,
    GetTopSellersHandler, GetTopSellersQuery,
};
use crate::application::handlers::settlement::{
    ProcessWebhookCommand, ProcessWebhookHandler, WebhookOutcome,
};
use crate::domain::foundation::DomainError;
use crate::domain::settlement::{CommissionCalculator, SettlementError};
use crate::ports::{
    OrderRepository, PayoutReader, PayoutRepository, ProcessedEventStore, WebhookVerifier,
};

use super::dto::{
    payouts_to_csv, ErrorResponse, PayoutSummaryResponse, PerformanceParams, PerformanceResponse,
    TopSellersParams, TopSellersResponse, TrendsParams, TrendsResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all settlement dependencies.
///
/// Cloned per request; dependencies are Arc-wrapped port objects.
#[derive(Clone)]
pub struct SettlementAppState {
    pub webhook_verifier: Arc<dyn WebhookVerifier>,
    pub processed_events: Arc<dyn ProcessedEventStore>,
    pub order_repository: Arc<dyn OrderRepository>,
    pub payout_repository: Arc<dyn PayoutRepository>,
    pub payout_reader: Arc<dyn PayoutReader>,
    pub commission: CommissionCalculator,
}

impl SettlementAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(
            self.webhook_verifier.clone(),
            self.processed_events.clone(),
            self.order_repository.clone(),
            self.payout_repository.clone(),
            self.commission,
        )
    }

    pub fn summary_handler(&self) -> GetPayoutSummaryHandler {
        GetPayoutSummaryHandler::new(self.payout_reader.clone())
    }

    pub fn top_sellers_handler(&self) -> GetTopSellersHandler {
        GetTopSellersHandler::new(self.payout_reader.clone())
    }

    pub fn trends_handler(&self) -> GetPayoutTrendsHandler {
        GetPayoutTrendsHandler::new(self.payout_reader.clone())
    }

    pub fn performance_handler(&self) -> GetPayoutPerformanceHandler {
        GetPayoutPerformanceHandler::new(self.payout_reader.clone())
    }

    pub fn export_handler(&self) -> ExportPayoutsHandler {
        ExportPayoutsHandler::new(self.payout_reader.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/payment-provider - Ingest a provider webhook delivery.
///
/// No authentication; the request is authenticated by its signature over
/// the raw body.
pub async fn handle_provider_webhook(
    State(state): State<SettlementAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, SettlementApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            SettlementApiError(SettlementError::InvalidSignature(
                "Missing Stripe-Signature header".to_string(),
            ))
        })?;

    let handler = state.webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let outcome = handler.handle(cmd).await?;

    let ack = match outcome {
        WebhookOutcome::Idempotent => WebhookAckResponse::idempotent(),
        WebhookOutcome::Processed | WebhookOutcome::Ignored => WebhookAckResponse::received(),
    };

    Ok((StatusCode::OK, Json(ack)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Reporting Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/payouts/summary - Payout totals grouped by status.
pub async fn get_payout_summary(
    State(state): State<SettlementAppState>,
) -> Result<impl IntoResponse, SettlementApiError> {
    let totals = state
        .summary_handler()
        .handle(GetPayoutSummaryQuery)
        .await?;

    Ok(Json(PayoutSummaryResponse {
        totals: totals.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/payouts/top-sellers - Sellers ranked by paid volume.
pub async fn get_top_sellers(
    State(state): State<SettlementAppState>,
    Query(params): Query<TopSellersParams>,
) -> Result<impl IntoResponse, SettlementApiError> {
    let query = params
        .limit
        .map(|limit| GetTopSellersQuery { limit })
        .unwrap_or_default();
    let sellers = state.top_sellers_handler().handle(query).await?;

    Ok(Json(TopSellersResponse {
        sellers: sellers.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/payouts/trends - Monthly payout activity.
pub async fn get_payout_trends(
    State(state): State<SettlementAppState>,
    Query(params): Query<TrendsParams>,
) -> Result<impl IntoResponse, SettlementApiError> {
    let query = params
        .months
        .map(|months| GetPayoutTrendsQuery { months })
        .unwrap_or_default();
    let trends = state.trends_handler().handle(query).await?;

    Ok(Json(TrendsResponse {
        trends: trends.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/payouts/performance - Transfer performance metrics.
pub async fn get_payout_performance(
    State(state): State<SettlementAppState>,
    Query(params): Query<PerformanceParams>,
) -> Result<impl IntoResponse, SettlementApiError> {
    let query = params
        .window_days
        .map(|window_days| GetPayoutPerformanceQuery { window_days })
        .unwrap_or_default();
    let metrics = state.performance_handler().handle(query).await?;

    Ok(Json(PerformanceResponse::from(metrics)))
}

/// GET /api/payouts/export.csv - Raw payout ledger as CSV.
pub async fn export_payouts_csv(
    State(state): State<SettlementAppState>,
) -> Result<impl IntoResponse, SettlementApiError> {
    let payouts = state.export_handler().handle().await?;
    let csv = payouts_to_csv(&payouts);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"payouts.csv\"",
            ),
        ],
        csv,
    ))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts settlement errors to HTTP responses.
pub struct SettlementApiError(SettlementError);

impl From<SettlementError> for SettlementApiError {
    fn from(err: SettlementError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for SettlementApiError {
    fn from(err: DomainError) -> Self {
        Self(SettlementError::Database(err.to_string()))
    }
}

impl IntoResponse for SettlementApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            SettlementError::InvalidSignature(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE")
            }
            SettlementError::MalformedEvent(_) => (StatusCode::BAD_REQUEST, "MALFORMED_EVENT"),
            SettlementError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Settlement request failed");
        } else {
            tracing::warn!(error = %self.0, "Settlement request rejected");
        }

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
