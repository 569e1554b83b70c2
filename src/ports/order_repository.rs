//! OrderRepository port - persistence interface for Order aggregates.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId};
use crate::domain::order::{Order, OrderStatus};

/// Port for storing and retrieving orders.
///
/// Settlement only ever applies *guarded* writes: `update_if_status`
/// persists the aggregate only while the stored row is still in the status
/// the transition started from. A `false` return means another handler got
/// there first, which callers treat as the effect having already landed.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a new order.
    async fn save(&self, order: &Order) -> Result<(), DomainError>;

    /// Finds an order by id.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Finds an order by its stored payment reference.
    async fn find_by_payment_intent(
        &self,
        payment_intent_ref: &str,
    ) -> Result<Option<Order>, DomainError>;

    /// Persists the aggregate if the stored status still equals `expected`.
    ///
    /// Returns `true` when the row was written, `false` when the stored
    /// status had already moved on (compare-and-set lost).
    async fn update_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, DomainError>;
}
