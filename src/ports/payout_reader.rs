//! PayoutReader port - read-only aggregations over the payout store.
//!
//! These queries have no side effects. Beyond feeding dashboards they act
//! as an aggregate cross-check on the settlement invariants: totals that
//! drift from order volume indicate a fan-out or reversal bug.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Money, SellerId};
use crate::domain::settlement::{Payout, PayoutStatus};

/// Count and net volume for one payout status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBreakdown {
    pub status: PayoutStatus,
    pub count: u64,
    pub net_total: Money,
}

/// One seller's paid-out volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerVolume {
    pub seller_id: SellerId,
    pub paid_count: u64,
    pub paid_net_total: Money,
}

/// Payout activity for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyTrend {
    /// Month bucket, `YYYY-MM`.
    pub month: String,
    pub created_count: u64,
    pub paid_count: u64,
    pub paid_net_total: Money,
}

/// A transfer failure reason and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub reason: String,
    pub count: u64,
}

/// Transfer performance over a trailing window.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Trailing window the metrics cover, in days.
    pub window_days: u32,

    /// Payouts paid within the window.
    pub paid_count: u64,

    /// Payouts failed within the window.
    pub failed_count: u64,

    /// `paid / (paid + failed)`; `None` when there were no outcomes.
    pub success_rate: Option<f64>,

    /// Mean seconds from payout creation to transfer completion.
    pub avg_settlement_secs: Option<f64>,

    /// Most common transfer failure reasons, descending by count.
    pub failure_reasons: Vec<FailureReason>,

    /// Of payouts that entered retry, the fraction now paid.
    pub retry_success_rate: Option<f64>,
}

/// Port for read-only payout reporting queries.
#[async_trait]
pub trait PayoutReader: Send + Sync {
    /// Count and net volume per status, across the whole ledger.
    async fn totals_by_status(&self) -> Result<Vec<StatusBreakdown>, DomainError>;

    /// Top sellers by paid net volume, descending.
    async fn top_sellers(&self, limit: u32) -> Result<Vec<SellerVolume>, DomainError>;

    /// Per-month created/paid counts and paid volume, most recent last.
    async fn monthly_trends(&self, months: u32) -> Result<Vec<MonthlyTrend>, DomainError>;

    /// Transfer performance metrics over a trailing window.
    async fn performance(&self, window_days: u32) -> Result<PerformanceMetrics, DomainError>;

    /// The raw payout ledger, ordered by creation time (CSV export).
    async fn export_all(&self) -> Result<Vec<Payout>, DomainError>;
}
