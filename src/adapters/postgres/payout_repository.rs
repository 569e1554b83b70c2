//! PostgreSQL implementation of PayoutRepository.
//!
//! The `(order_id, seller_id)` unique constraint is the second idempotency
//! layer behind the event ledger: `INSERT ... ON CONFLICT DO NOTHING`
//! makes a racing or re-run fan-out skip sellers that already have a
//! payout instead of double-paying them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, OrderId, PayoutId, SellerId, Timestamp,
};
use crate::domain::settlement::{Payout, PayoutStatus};
use crate::ports::{InsertOutcome, PayoutRepository};

/// PostgreSQL implementation of the PayoutRepository port.
pub struct PostgresPayoutRepository {
    pool: PgPool,
}

impl PostgresPayoutRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payout.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PayoutRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub seller_id: String,
    pub gross_amount: i64,
    pub commission: i64,
    pub net_amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub provider_ref: Option<String>,
    pub last_error: Option<String>,
    pub retry_count: i32,
    pub cancel_reason: Option<String>,
}

impl TryFrom<PayoutRow> for Payout {
    type Error = DomainError;

    fn try_from(row: PayoutRow) -> Result<Self, Self::Error> {
        let status = PayoutStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid payout status value: {}", row.status),
            )
        })?;

        Ok(Payout {
            id: PayoutId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            seller_id: SellerId::new(row.seller_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid seller_id: {}", e))
            })?,
            gross_amount: Money::from_minor(row.gross_amount),
            commission: Money::from_minor(row.commission),
            net_amount: Money::from_minor(row.net_amount),
            currency: row.currency,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            provider_ref: row.provider_ref,
            last_error: row.last_error,
            retry_count: row.retry_count.max(0) as u32,
            cancel_reason: row.cancel_reason,
        })
    }
}

pub(crate) const PAYOUT_COLUMNS: &str = "id, order_id, seller_id, gross_amount, commission, \
     net_amount, currency, status, created_at, paid_at, provider_ref, last_error, retry_count, \
     cancel_reason";

#[async_trait]
impl PayoutRepository for PostgresPayoutRepository {
    async fn insert(&self, payout: &Payout) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payouts (
                id, order_id, seller_id, gross_amount, commission, net_amount,
                currency, status, created_at, paid_at, provider_ref, last_error,
                retry_count, cancel_reason
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (order_id, seller_id) DO NOTHING
            "#,
        )
        .bind(payout.id.as_uuid())
        .bind(payout.order_id.as_uuid())
        .bind(payout.seller_id.as_str())
        .bind(payout.gross_amount.minor())
        .bind(payout.commission.minor())
        .bind(payout.net_amount.minor())
        .bind(&payout.currency)
        .bind(payout.status.as_str())
        .bind(payout.created_at.as_datetime())
        .bind(payout.paid_at.map(|t| *t.as_datetime()))
        .bind(&payout.provider_ref)
        .bind(&payout.last_error)
        .bind(payout.retry_count as i32)
        .bind(&payout.cancel_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert payout: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn find_by_order_and_seller(
        &self,
        order_id: &OrderId,
        seller_id: &SellerId,
    ) -> Result<Option<Payout>, DomainError> {
        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payouts WHERE order_id = $1 AND seller_id = $2",
            PAYOUT_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .bind(seller_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find payout: {}", e),
            )
        })?;

        row.map(Payout::try_from).transpose()
    }

    async fn list_by_order(&self, order_id: &OrderId) -> Result<Vec<Payout>, DomainError> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payouts WHERE order_id = $1 ORDER BY created_at",
            PAYOUT_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list payouts: {}", e),
            )
        })?;

        rows.into_iter().map(Payout::try_from).collect()
    }

    async fn update(&self, payout: &Payout) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payouts SET
                status = $2,
                paid_at = $3,
                provider_ref = $4,
                last_error = $5,
                retry_count = $6,
                cancel_reason = $7
            WHERE id = $1
            "#,
        )
        .bind(payout.id.as_uuid())
        .bind(payout.status.as_str())
        .bind(payout.paid_at.map(|t| *t.as_datetime()))
        .bind(&payout.provider_ref)
        .bind(&payout.last_error)
        .bind(payout.retry_count as i32)
        .bind(&payout.cancel_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update payout: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PayoutNotFound,
                "Payout not found",
            ));
        }

        Ok(())
    }

    async fn cancel_pending_for_order(
        &self,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payouts SET
                status = 'canceled',
                cancel_reason = $2
            WHERE order_id = $1 AND status = 'pending'
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to cancel pending payouts: {}", e),
            )
        })?;

        Ok(result.rows_affected())
    }
}
