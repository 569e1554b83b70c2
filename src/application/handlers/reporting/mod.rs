//! Reporting query handlers.

mod payout_reports;

pub use payout_reports::{
    ExportPayoutsHandler, GetPayoutPerformanceHandler, GetPayoutPerformanceQuery,
    GetPayoutSummaryHandler, GetPayoutSummaryQuery, GetPayoutTrendsHandler, GetPayoutTrendsQuery,
    GetTopSellersHandler, GetTopSellersQuery,
};
