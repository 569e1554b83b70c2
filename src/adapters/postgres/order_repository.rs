//! PostgreSQL implementation of OrderRepository.
//!
//! Orders live in a single `orders` table with the line items as a JSONB
//! column, mirroring the document shape they had at checkout. Settlement
//! writes go through a compare-and-set on `status` so a concurrent forward
//! transition is never overwritten.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Money, OrderId, Timestamp};
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::ports::OrderRepository;

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    status: String,
    items: serde_json::Value,
    total_price: i64,
    currency: String,
    payment_intent_ref: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid order status value: {}", row.status),
            )
        })?;

        let items: Vec<OrderItem> = serde_json::from_value(row.items).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid order items payload: {}", e),
            )
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            status,
            items,
            total_price: Money::from_minor(row.total_price),
            currency: row.currency,
            payment_intent_ref: row.payment_intent_ref,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn items_to_json(order: &Order) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(&order.items).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to serialize order items: {}", e),
        )
    })
}

const SELECT_COLUMNS: &str = "id, status, items, total_price, currency, payment_intent_ref, \
     paid_at, refunded_at, created_at, updated_at";

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, status, items, total_price, currency, payment_intent_ref,
                paid_at, refunded_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(items_to_json(order)?)
        .bind(order.total_price.minor())
        .bind(&order.currency)
        .bind(&order.payment_intent_ref)
        .bind(order.paid_at.map(|t| *t.as_datetime()))
        .bind(order.refunded_at.map(|t| *t.as_datetime()))
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save order: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find order: {}", e),
            )
        })?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_ref: &str,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE payment_intent_ref = $1",
            SELECT_COLUMNS
        ))
        .bind(payment_intent_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find order by payment intent: {}", e),
            )
        })?;

        row.map(Order::try_from).transpose()
    }

    async fn update_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $2,
                payment_intent_ref = $3,
                paid_at = $4,
                refunded_at = $5,
                updated_at = $6
            WHERE id = $1 AND status = $7
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(&order.payment_intent_ref)
        .bind(order.paid_at.map(|t| *t.as_datetime()))
        .bind(order.refunded_at.map(|t| *t.as_datetime()))
        .bind(order.updated_at.as_datetime())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update order: {}", e),
            )
        })?;

        Ok(result.rows_affected() > 0)
    }
}
