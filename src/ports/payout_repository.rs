//! PayoutRepository port - persistence interface for payout records.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, SellerId};
use crate::domain::settlement::Payout;

/// Result of attempting to insert a payout.
///
/// Implementations back this with a unique constraint on
/// `(order_id, seller_id)` so concurrent settlement of the same order
/// cannot double-insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The payout was inserted by this call.
    Inserted,

    /// A payout for this `(order_id, seller_id)` already exists.
    AlreadyExists,
}

/// Port for storing and mutating payout records.
///
/// Payouts are never deleted. Settlement creates them and cancels pending
/// ones; the external transfer step owns the `pending -> paid/failed`
/// transitions through `update`.
#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Inserts a payout unless one exists for the same `(order_id, seller_id)`.
    async fn insert(&self, payout: &Payout) -> Result<InsertOutcome, DomainError>;

    /// Finds the payout for one seller on one order.
    async fn find_by_order_and_seller(
        &self,
        order_id: &OrderId,
        seller_id: &SellerId,
    ) -> Result<Option<Payout>, DomainError>;

    /// Lists all payouts for an order.
    async fn list_by_order(&self, order_id: &OrderId) -> Result<Vec<Payout>, DomainError>;

    /// Persists changes to an existing payout (transfer step transitions).
    async fn update(&self, payout: &Payout) -> Result<(), DomainError>;

    /// Cancels every `pending` payout of the order in one sweep.
    ///
    /// `paid`, `failed`, `retrying` and already-`canceled` payouts are left
    /// untouched. Returns the number of payouts cancelled; safe to re-run.
    async fn cancel_pending_for_order(
        &self,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<u64, DomainError>;
}
