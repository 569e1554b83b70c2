//! Query handlers for payout reporting.
//!
//! Thin pass-throughs over the `PayoutReader` port with input clamping.
//! All queries are read-only.

use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::settlement::Payout;
use crate::ports::{
    MonthlyTrend, PayoutReader, PerformanceMetrics, SellerVolume, StatusBreakdown,
};

/// Upper bound on the top-sellers page size.
const MAX_TOP_SELLERS_LIMIT: u32 = 100;

/// Upper bound on the trend window.
const MAX_TREND_MONTHS: u32 = 60;

/// Upper bound on the performance window.
const MAX_PERFORMANCE_WINDOW_DAYS: u32 = 365;

/// Query for payout totals grouped by status.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPayoutSummaryQuery;

/// Handler returning payout totals by status.
pub struct GetPayoutSummaryHandler {
    reader: Arc<dyn PayoutReader>,
}

impl GetPayoutSummaryHandler {
    pub fn new(reader: Arc<dyn PayoutReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        _query: GetPayoutSummaryQuery,
    ) -> Result<Vec<StatusBreakdown>, DomainError> {
        self.reader.totals_by_status().await
    }
}

/// Query for the top sellers by paid volume.
#[derive(Debug, Clone, Copy)]
pub struct GetTopSellersQuery {
    pub limit: u32,
}

impl Default for GetTopSellersQuery {
    fn default() -> Self {
        Self { limit: 10 }
    }
}

/// Handler returning sellers ranked by paid net volume.
pub struct GetTopSellersHandler {
    reader: Arc<dyn PayoutReader>,
}

impl GetTopSellersHandler {
    pub fn new(reader: Arc<dyn PayoutReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetTopSellersQuery,
    ) -> Result<Vec<SellerVolume>, DomainError> {
        let limit = query.limit.clamp(1, MAX_TOP_SELLERS_LIMIT);
        self.reader.top_sellers(limit).await
    }
}

/// Query for monthly payout trends.
#[derive(Debug, Clone, Copy)]
pub struct GetPayoutTrendsQuery {
    pub months: u32,
}

impl Default for GetPayoutTrendsQuery {
    fn default() -> Self {
        Self { months: 12 }
    }
}

/// Handler returning per-month payout activity.
pub struct GetPayoutTrendsHandler {
    reader: Arc<dyn PayoutReader>,
}

impl GetPayoutTrendsHandler {
    pub fn new(reader: Arc<dyn PayoutReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetPayoutTrendsQuery,
    ) -> Result<Vec<MonthlyTrend>, DomainError> {
        let months = query.months.clamp(1, MAX_TREND_MONTHS);
        self.reader.monthly_trends(months).await
    }
}

/// Query for transfer performance over a trailing window.
#[derive(Debug, Clone, Copy)]
pub struct GetPayoutPerformanceQuery {
    pub window_days: u32,
}

impl Default for GetPayoutPerformanceQuery {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

/// Handler returning transfer performance metrics.
pub struct GetPayoutPerformanceHandler {
    reader: Arc<dyn PayoutReader>,
}

impl GetPayoutPerformanceHandler {
    pub fn new(reader: Arc<dyn PayoutReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetPayoutPerformanceQuery,
    ) -> Result<PerformanceMetrics, DomainError> {
        let window = query.window_days.clamp(1, MAX_PERFORMANCE_WINDOW_DAYS);
        self.reader.performance(window).await
    }
}

/// Handler returning the raw payout ledger for export.
pub struct ExportPayoutsHandler {
    reader: Arc<dyn PayoutReader>,
}

impl ExportPayoutsHandler {
    pub fn new(reader: Arc<dyn PayoutReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(&self) -> Result<Vec<Payout>, DomainError> {
        self.reader.export_all().await
    }
}
