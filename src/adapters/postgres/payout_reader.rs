//! PostgreSQL implementation of PayoutReader.
//!
//! All aggregation happens in SQL; the adapter only reshapes rows into the
//! port's report types.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Money, SellerId, Timestamp};
use crate::domain::settlement::{Payout, PayoutStatus};
use crate::ports::{
    FailureReason, MonthlyTrend, PayoutReader, PerformanceMetrics, SellerVolume, StatusBreakdown,
};

use super::payout_repository::{PayoutRow, PAYOUT_COLUMNS};

/// PostgreSQL implementation of the PayoutReader port.
pub struct PostgresPayoutReader {
    pool: PgPool,
}

impl PostgresPayoutReader {
    /// Creates a new reader with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    status: String,
    count: i64,
    net_total: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SellerRow {
    seller_id: String,
    paid_count: i64,
    paid_net_total: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TrendRow {
    month: String,
    created_count: i64,
    paid_count: i64,
    paid_net_total: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PaidStatsRow {
    paid_count: i64,
    avg_settlement_secs: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct ReasonRow {
    reason: String,
    count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct RetryRow {
    retried: i64,
    retried_paid: i64,
}

#[async_trait]
impl PayoutReader for PostgresPayoutReader {
    async fn totals_by_status(&self) -> Result<Vec<StatusBreakdown>, DomainError> {
        let rows: Vec<StatusRow> = sqlx::query_as(
            r#"
            SELECT status,
                   COUNT(*) AS count,
                   COALESCE(SUM(net_amount), 0)::BIGINT AS net_total
            FROM payouts
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to aggregate payout totals", e))?;

        rows.into_iter()
            .map(|row| {
                let status = PayoutStatus::parse(&row.status).ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Invalid payout status value: {}", row.status),
                    )
                })?;
                Ok(StatusBreakdown {
                    status,
                    count: row.count.max(0) as u64,
                    net_total: Money::from_minor(row.net_total),
                })
            })
            .collect()
    }

    async fn top_sellers(&self, limit: u32) -> Result<Vec<SellerVolume>, DomainError> {
        let rows: Vec<SellerRow> = sqlx::query_as(
            r#"
            SELECT seller_id,
                   COUNT(*) AS paid_count,
                   COALESCE(SUM(net_amount), 0)::BIGINT AS paid_net_total
            FROM payouts
            WHERE status = 'paid'
            GROUP BY seller_id
            ORDER BY paid_net_total DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to rank sellers", e))?;

        rows.into_iter()
            .map(|row| {
                Ok(SellerVolume {
                    seller_id: SellerId::new(row.seller_id).map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Invalid seller_id: {}", e),
                        )
                    })?,
                    paid_count: row.paid_count.max(0) as u64,
                    paid_net_total: Money::from_minor(row.paid_net_total),
                })
            })
            .collect()
    }

    async fn monthly_trends(&self, months: u32) -> Result<Vec<MonthlyTrend>, DomainError> {
        // Created and paid activity land in different month buckets, so
        // both are unioned before grouping.
        let mut rows: Vec<TrendRow> = sqlx::query_as(
            r#"
            SELECT month,
                   SUM(created_count)::BIGINT AS created_count,
                   SUM(paid_count)::BIGINT AS paid_count,
                   SUM(paid_net_total)::BIGINT AS paid_net_total
            FROM (
                SELECT to_char(created_at, 'YYYY-MM') AS month,
                       1 AS created_count, 0 AS paid_count, 0 AS paid_net_total
                FROM payouts
                UNION ALL
                SELECT to_char(paid_at, 'YYYY-MM') AS month,
                       0, 1, net_amount
                FROM payouts
                WHERE paid_at IS NOT NULL
            ) activity
            GROUP BY month
            ORDER BY month DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(months))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to aggregate monthly trends", e))?;

        rows.reverse(); // most recent last

        Ok(rows
            .into_iter()
            .map(|row| MonthlyTrend {
                month: row.month,
                created_count: row.created_count.max(0) as u64,
                paid_count: row.paid_count.max(0) as u64,
                paid_net_total: Money::from_minor(row.paid_net_total),
            })
            .collect())
    }

    async fn performance(&self, window_days: u32) -> Result<PerformanceMetrics, DomainError> {
        let cutoff = *Timestamp::now()
            .minus_days(i64::from(window_days))
            .as_datetime();

        let paid: PaidStatsRow = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS paid_count,
                   AVG(EXTRACT(EPOCH FROM (paid_at - created_at)))::DOUBLE PRECISION
                       AS avg_settlement_secs
            FROM payouts
            WHERE paid_at >= $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to aggregate paid stats", e))?;

        let failed_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM payouts
            WHERE status = 'failed' AND created_at >= $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count failed payouts", e))?;

        let reasons: Vec<ReasonRow> = sqlx::query_as(
            r#"
            SELECT COALESCE(last_error, 'unknown') AS reason,
                   COUNT(*) AS count
            FROM payouts
            WHERE status = 'failed' AND created_at >= $1
            GROUP BY reason
            ORDER BY count DESC
            LIMIT 10
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to aggregate failure reasons", e))?;

        let retries: RetryRow = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS retried,
                   COUNT(*) FILTER (WHERE status = 'paid') AS retried_paid
            FROM payouts
            WHERE retry_count > 0 AND created_at >= $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to aggregate retry stats", e))?;

        let paid_count = paid.paid_count.max(0) as u64;
        let failed_count = failed_count.max(0) as u64;
        let outcomes = paid_count + failed_count;

        Ok(PerformanceMetrics {
            window_days,
            paid_count,
            failed_count,
            success_rate: (outcomes > 0).then(|| paid_count as f64 / outcomes as f64),
            avg_settlement_secs: paid.avg_settlement_secs,
            failure_reasons: reasons
                .into_iter()
                .map(|r| FailureReason {
                    reason: r.reason,
                    count: r.count.max(0) as u64,
                })
                .collect(),
            retry_success_rate: (retries.retried > 0)
                .then(|| retries.retried_paid as f64 / retries.retried as f64),
        })
    }

    async fn export_all(&self) -> Result<Vec<Payout>, DomainError> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payouts ORDER BY created_at",
            PAYOUT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to export payouts", e))?;

        rows.into_iter().map(Payout::try_from).collect()
    }
}
