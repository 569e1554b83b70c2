//! Request/response DTOs for the settlement HTTP surface.
//!
//! Monetary fields travel as integer minor units, matching the provider
//! wire convention; the CSV export uses two-decimal strings because it is
//! a human-facing ledger.

use serde::{Deserialize, Serialize};

use crate::domain::settlement::Payout;
use crate::ports::{
    FailureReason, MonthlyTrend, PerformanceMetrics, SellerVolume, StatusBreakdown,
};

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgment returned to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    /// Always true on 2xx.
    pub received: bool,

    /// Present and true when the delivery was a duplicate no-op.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
}

impl WebhookAckResponse {
    /// Ack for a delivery that performed (or safely skipped) work.
    pub fn received() -> Self {
        Self {
            received: true,
            idempotent: None,
        }
    }

    /// Ack for a duplicate delivery.
    pub fn idempotent() -> Self {
        Self {
            received: true,
            idempotent: Some(true),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Reporting
// ════════════════════════════════════════════════════════════════════════════════

/// Query parameters for the top-sellers endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TopSellersParams {
    pub limit: Option<u32>,
}

/// Query parameters for the trends endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TrendsParams {
    pub months: Option<u32>,
}

/// Query parameters for the performance endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PerformanceParams {
    pub window_days: Option<u32>,
}

/// One status bucket of the payout summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatusTotalDto {
    pub status: String,
    pub count: u64,
    pub net_total: i64,
}

impl From<StatusBreakdown> for StatusTotalDto {
    fn from(b: StatusBreakdown) -> Self {
        Self {
            status: b.status.as_str().to_string(),
            count: b.count,
            net_total: b.net_total.minor(),
        }
    }
}

/// Payout totals grouped by status.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutSummaryResponse {
    pub totals: Vec<StatusTotalDto>,
}

/// One seller in the top-sellers ranking.
#[derive(Debug, Clone, Serialize)]
pub struct TopSellerDto {
    pub seller_id: String,
    pub paid_count: u64,
    pub paid_net_total: i64,
}

impl From<SellerVolume> for TopSellerDto {
    fn from(v: SellerVolume) -> Self {
        Self {
            seller_id: v.seller_id.to_string(),
            paid_count: v.paid_count,
            paid_net_total: v.paid_net_total.minor(),
        }
    }
}

/// Top sellers by paid volume.
#[derive(Debug, Clone, Serialize)]
pub struct TopSellersResponse {
    pub sellers: Vec<TopSellerDto>,
}

/// One month of payout activity.
#[derive(Debug, Clone, Serialize)]
pub struct TrendDto {
    pub month: String,
    pub created_count: u64,
    pub paid_count: u64,
    pub paid_net_total: i64,
}

impl From<MonthlyTrend> for TrendDto {
    fn from(t: MonthlyTrend) -> Self {
        Self {
            month: t.month,
            created_count: t.created_count,
            paid_count: t.paid_count,
            paid_net_total: t.paid_net_total.minor(),
        }
    }
}

/// Monthly payout trends.
#[derive(Debug, Clone, Serialize)]
pub struct TrendsResponse {
    pub trends: Vec<TrendDto>,
}

/// One transfer failure reason.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReasonDto {
    pub reason: String,
    pub count: u64,
}

impl From<FailureReason> for FailureReasonDto {
    fn from(f: FailureReason) -> Self {
        Self {
            reason: f.reason,
            count: f.count,
        }
    }
}

/// Transfer performance metrics.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceResponse {
    pub window_days: u32,
    pub paid_count: u64,
    pub failed_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_settlement_secs: Option<f64>,
    pub failure_reasons: Vec<FailureReasonDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_success_rate: Option<f64>,
}

impl From<PerformanceMetrics> for PerformanceResponse {
    fn from(m: PerformanceMetrics) -> Self {
        Self {
            window_days: m.window_days,
            paid_count: m.paid_count,
            failed_count: m.failed_count,
            success_rate: m.success_rate,
            avg_settlement_secs: m.avg_settlement_secs,
            failure_reasons: m.failure_reasons.into_iter().map(Into::into).collect(),
            retry_success_rate: m.retry_success_rate,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// CSV Export
// ════════════════════════════════════════════════════════════════════════════════

/// Column header of the payout ledger export. The order is fixed and
/// matches the payout record fields.
pub const PAYOUT_CSV_HEADER: &str = "id,order_id,seller_id,gross_amount,commission,net_amount,\
currency,status,created_at,paid_at,provider_ref,last_error,retry_count,cancel_reason";

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Renders one payout as a CSV row in the fixed column order.
pub fn payout_csv_row(payout: &Payout) -> String {
    let cells = [
        payout.id.to_string(),
        payout.order_id.to_string(),
        payout.seller_id.to_string(),
        payout.gross_amount.to_decimal_string(),
        payout.commission.to_decimal_string(),
        payout.net_amount.to_decimal_string(),
        payout.currency.clone(),
        payout.status.as_str().to_string(),
        payout.created_at.to_string(),
        payout.paid_at.map(|t| t.to_string()).unwrap_or_default(),
        payout.provider_ref.clone().unwrap_or_default(),
        payout.last_error.clone().unwrap_or_default(),
        payout.retry_count.to_string(),
        payout.cancel_reason.clone().unwrap_or_default(),
    ];

    cells
        .iter()
        .map(|c| csv_escape(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders the whole ledger as a CSV document.
pub fn payouts_to_csv(payouts: &[Payout]) -> String {
    let mut out = String::from(PAYOUT_CSV_HEADER);
    out.push('\n');
    for payout in payouts {
        out.push_str(&payout_csv_row(payout));
        out.push('\n');
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════════

/// Error payload returned on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    /// Creates an error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Money, OrderId, SellerId, Timestamp};
    use crate::domain::settlement::CommissionCalculator;

    fn payout() -> Payout {
        let gross = Money::from_major(200);
        Payout::create(
            OrderId::new(),
            SellerId::new("seller-a").unwrap(),
            gross,
            CommissionCalculator::default().calculate(gross),
            "usd",
            Timestamp::now(),
        )
    }

    #[test]
    fn ack_serializes_without_idempotent_flag() {
        let json = serde_json::to_string(&WebhookAckResponse::received()).unwrap();
        assert_eq!(json, r#"{"received":true}"#);
    }

    #[test]
    fn idempotent_ack_carries_flag() {
        let json = serde_json::to_string(&WebhookAckResponse::idempotent()).unwrap();
        assert_eq!(json, r#"{"received":true,"idempotent":true}"#);
    }

    #[test]
    fn csv_row_uses_fixed_column_order() {
        let payout = payout();
        let row = payout_csv_row(&payout);
        let cells: Vec<&str> = row.split(',').collect();

        assert_eq!(cells.len(), PAYOUT_CSV_HEADER.split(',').count());
        assert_eq!(cells[2], "seller-a");
        assert_eq!(cells[3], "200.00");
        assert_eq!(cells[4], "20.00");
        assert_eq!(cells[5], "180.00");
        assert_eq!(cells[7], "pending");
    }

    #[test]
    fn csv_escapes_embedded_delimiters() {
        let mut payout = payout();
        payout.mark_failed("card_declined, code=42").unwrap();

        let row = payout_csv_row(&payout);

        assert!(row.contains("\"card_declined, code=42\""));
    }

    #[test]
    fn csv_document_has_header_and_rows() {
        let payouts = vec![payout(), payout()];
        let doc = payouts_to_csv(&payouts);
        let lines: Vec<&str> = doc.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], PAYOUT_CSV_HEADER);
    }
}
