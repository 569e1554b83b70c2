//! Order aggregate entity.
//!
//! The Order aggregate carries the payment-relevant view of a checkout:
//! line items attributed to sellers, the provider payment reference, and the
//! settlement timestamps.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: all amounts are integer cents, never floats.
//! - **Guarded transitions**: every settlement mutation checks the state
//!   machine first and reports duplicates as explicit no-ops, so handlers
//!   stay idempotent even without the event-level dedup ledger.
//! - **Set-once fields**: `payment_intent_ref`, `paid_at` and `refunded_at`
//!   are written on first application and never overwritten.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, OrderId, SellerId, StateMachine, Timestamp, ValidationError,
};

use super::OrderStatus;

/// A single order line attributed to one seller.
///
/// Items are immutable after order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Seller receiving the proceeds of this line.
    pub seller_id: SellerId,

    /// Unit price in minor units.
    pub price: Money,

    /// Units purchased. Always at least 1.
    pub quantity: u32,
}

impl OrderItem {
    /// Creates a validated order line.
    pub fn new(seller_id: SellerId, price: Money, quantity: u32) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::out_of_range(
                "quantity",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(Self {
            seller_id,
            price,
            quantity,
        })
    }

    /// Seller-attributable revenue of this line (`price * quantity`).
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// Outcome of a guarded settlement mutation.
///
/// `AlreadyApplied` signals a duplicate of an effect that has already
/// landed; callers treat it as success without re-applying side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The transition was applied by this call.
    Applied,

    /// The order was already in (or past) the target state.
    AlreadyApplied,
}

/// Order aggregate.
///
/// # Invariants
///
/// - `status` only moves forward along the [`OrderStatus`] state machine.
/// - `items` is non-empty and immutable after creation.
/// - `payment_intent_ref` is set exactly once, on first payment.
/// - `paid_at` / `refunded_at` are set exactly once, monotonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier, assigned at checkout initiation.
    pub id: OrderId,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// Order lines, one or more sellers.
    pub items: Vec<OrderItem>,

    /// Total charged to the buyer, in minor units.
    pub total_price: Money,

    /// ISO currency code, lowercase (provider convention).
    pub currency: String,

    /// Opaque reference to the provider's payment object.
    pub payment_intent_ref: Option<String>,

    /// When the payment confirmation was applied.
    pub paid_at: Option<Timestamp>,

    /// When the refund was applied.
    pub refunded_at: Option<Timestamp>,

    /// When the order was created.
    pub created_at: Timestamp,

    /// When the order was last updated.
    pub updated_at: Timestamp,
}

impl Order {
    /// Creates a new order in `PendingPayment`.
    ///
    /// The total is derived from the items; it is not accepted from the
    /// caller, so the sum invariant holds by construction.
    pub fn new(
        id: OrderId,
        items: Vec<OrderItem>,
        currency: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::empty_field("items"));
        }
        let total_price = items.iter().map(OrderItem::line_total).sum();
        let now = Timestamp::now();
        Ok(Self {
            id,
            status: OrderStatus::PendingPayment,
            items,
            total_price,
            currency: currency.into(),
            payment_intent_ref: None,
            paid_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a payment confirmation.
    ///
    /// Idempotent: once the order is `Paid` or any later forward state the
    /// call is a no-op reporting `AlreadyApplied`. The payment reference is
    /// recorded on first application and never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the order can no longer accept
    /// a payment (failed, cancelled, rejected).
    pub fn mark_paid(
        &mut self,
        payment_intent_ref: &str,
        now: Timestamp,
    ) -> Result<SettleOutcome, DomainError> {
        if self.status.is_settled() {
            return Ok(SettleOutcome::AlreadyApplied);
        }

        self.status = self
            .status
            .transition_to(OrderStatus::Paid)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        if self.payment_intent_ref.is_none() {
            self.payment_intent_ref = Some(payment_intent_ref.to_string());
        }
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(SettleOutcome::Applied)
    }

    /// Records a failed payment attempt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the order is past the point
    /// where a payment failure is meaningful.
    pub fn mark_payment_failed(&mut self, now: Timestamp) -> Result<SettleOutcome, DomainError> {
        if self.status == OrderStatus::PaymentFailed {
            return Ok(SettleOutcome::AlreadyApplied);
        }

        self.status = self
            .status
            .transition_to(OrderStatus::PaymentFailed)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.updated_at = now;
        Ok(SettleOutcome::Applied)
    }

    /// Applies a refund.
    ///
    /// Idempotent: an already-refunded order reports `AlreadyApplied`.
    /// `refunded_at` is set on first application only.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the order was never paid.
    pub fn mark_refunded(&mut self, now: Timestamp) -> Result<SettleOutcome, DomainError> {
        if self.status == OrderStatus::Refunded {
            return Ok(SettleOutcome::AlreadyApplied);
        }

        self.status = self
            .status
            .transition_to(OrderStatus::Refunded)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.refunded_at = Some(now);
        self.updated_at = now;
        Ok(SettleOutcome::Applied)
    }

    /// Distinct sellers appearing in this order's items.
    pub fn seller_count(&self) -> usize {
        let mut sellers: Vec<&SellerId> = self.items.iter().map(|i| &i.seller_id).collect();
        sellers.sort();
        sellers.dedup();
        sellers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller(id: &str) -> SellerId {
        SellerId::new(id).unwrap()
    }

    fn two_seller_order() -> Order {
        Order::new(
            OrderId::new(),
            vec![
                OrderItem::new(seller("seller-a"), Money::from_major(100), 2).unwrap(),
                OrderItem::new(seller("seller-b"), Money::from_major(50), 1).unwrap(),
            ],
            "usd",
        )
        .unwrap()
    }

    #[test]
    fn new_order_derives_total_from_items() {
        let order = two_seller_order();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.total_price, Money::from_major(250));
        assert_eq!(order.seller_count(), 2);
    }

    #[test]
    fn new_order_rejects_empty_items() {
        assert!(Order::new(OrderId::new(), vec![], "usd").is_err());
    }

    #[test]
    fn item_rejects_zero_quantity() {
        assert!(OrderItem::new(seller("s"), Money::from_major(10), 0).is_err());
    }

    #[test]
    fn mark_paid_transitions_and_records_reference() {
        let mut order = two_seller_order();
        let now = Timestamp::now();

        let outcome = order.mark_paid("pi_123", now).unwrap();

        assert_eq!(outcome, SettleOutcome::Applied);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_intent_ref.as_deref(), Some("pi_123"));
        assert_eq!(order.paid_at, Some(now));
    }

    #[test]
    fn mark_paid_twice_is_a_noop() {
        let mut order = two_seller_order();
        let first = Timestamp::now();
        order.mark_paid("pi_123", first).unwrap();

        let outcome = order.mark_paid("pi_456", Timestamp::now()).unwrap();

        assert_eq!(outcome, SettleOutcome::AlreadyApplied);
        // Reference and paid_at are never overwritten.
        assert_eq!(order.payment_intent_ref.as_deref(), Some("pi_123"));
        assert_eq!(order.paid_at, Some(first));
    }

    #[test]
    fn mark_paid_after_cancel_is_rejected() {
        let mut order = two_seller_order();
        order.status = OrderStatus::Cancelled;

        let result = order.mark_paid("pi_123", Timestamp::now());

        assert!(result.is_err());
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn mark_payment_failed_from_pending() {
        let mut order = two_seller_order();
        let outcome = order.mark_payment_failed(Timestamp::now()).unwrap();
        assert_eq!(outcome, SettleOutcome::Applied);
        assert_eq!(order.status, OrderStatus::PaymentFailed);
    }

    #[test]
    fn mark_payment_failed_is_idempotent() {
        let mut order = two_seller_order();
        order.mark_payment_failed(Timestamp::now()).unwrap();

        let outcome = order.mark_payment_failed(Timestamp::now()).unwrap();

        assert_eq!(outcome, SettleOutcome::AlreadyApplied);
    }

    #[test]
    fn mark_refunded_requires_paid() {
        let mut order = two_seller_order();
        assert!(order.mark_refunded(Timestamp::now()).is_err());

        order.mark_paid("pi_123", Timestamp::now()).unwrap();
        let outcome = order.mark_refunded(Timestamp::now()).unwrap();

        assert_eq!(outcome, SettleOutcome::Applied);
        assert_eq!(order.status, OrderStatus::Refunded);
        assert!(order.refunded_at.is_some());
    }

    #[test]
    fn mark_refunded_twice_is_a_noop() {
        let mut order = two_seller_order();
        order.mark_paid("pi_123", Timestamp::now()).unwrap();
        let first = Timestamp::now();
        order.mark_refunded(first).unwrap();

        let outcome = order.mark_refunded(Timestamp::now()).unwrap();

        assert_eq!(outcome, SettleOutcome::AlreadyApplied);
        assert_eq!(order.refunded_at, Some(first));
    }

    #[test]
    fn refunded_order_never_moves_again() {
        let mut order = two_seller_order();
        order.mark_paid("pi_123", Timestamp::now()).unwrap();
        order.mark_refunded(Timestamp::now()).unwrap();

        assert!(order.mark_payment_failed(Timestamp::now()).is_err());
        assert_eq!(
            order.mark_paid("pi_999", Timestamp::now()).unwrap(),
            SettleOutcome::AlreadyApplied
        );
        assert_eq!(order.status, OrderStatus::Refunded);
    }
}
