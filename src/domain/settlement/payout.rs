//! Payout record - money owed to one seller for one order.
//!
//! Payouts are created only by the payment-succeeded handler, cancelled only
//! by the refund handler, and paid out by a transfer step that lives outside
//! this core. They are never deleted.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, OrderId, PayoutId, SellerId, StateMachine, Timestamp,
};

use super::CommissionBreakdown;

/// Payout lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Created by settlement, awaiting the transfer step.
    Pending,

    /// Transfer completed by the external payout processor.
    Paid,

    /// Transfer attempt failed.
    Failed,

    /// A failed transfer is being retried.
    Retrying,

    /// Cancelled before transfer (e.g. the order was refunded).
    Canceled,
}

impl PayoutStatus {
    /// Returns the wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Retrying => "retrying",
            PayoutStatus::Canceled => "canceled",
        }
    }

    /// Parses the wire/database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PayoutStatus::Pending),
            "paid" => Some(PayoutStatus::Paid),
            "failed" => Some(PayoutStatus::Failed),
            "retrying" => Some(PayoutStatus::Retrying),
            "canceled" => Some(PayoutStatus::Canceled),
            _ => None,
        }
    }
}

impl StateMachine for PayoutStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, target),
            (Pending, Paid)
                | (Pending, Failed)
                | (Pending, Canceled)
                | (Failed, Retrying)
                | (Retrying, Paid)
                | (Retrying, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PayoutStatus::*;
        match self {
            Pending => vec![Paid, Failed, Canceled],
            Failed => vec![Retrying],
            Retrying => vec![Paid, Failed],
            Paid => vec![],
            Canceled => vec![],
        }
    }
}

/// Money owed to one seller for one order.
///
/// # Invariants
///
/// - `(order_id, seller_id)` is unique across the store.
/// - `commission + net_amount == gross_amount` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Unique identifier.
    pub id: PayoutId,

    /// Order this payout settles.
    pub order_id: OrderId,

    /// Seller owed the net amount.
    pub seller_id: SellerId,

    /// Seller-attributable revenue before commission.
    pub gross_amount: Money,

    /// Platform fee deducted.
    pub commission: Money,

    /// Amount owed to the seller.
    pub net_amount: Money,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Current lifecycle status.
    pub status: PayoutStatus,

    /// When settlement created this payout.
    pub created_at: Timestamp,

    /// When the external transfer completed.
    pub paid_at: Option<Timestamp>,

    /// Transfer reference assigned by the external payout processor.
    pub provider_ref: Option<String>,

    /// Last transfer error, if any attempt failed.
    pub last_error: Option<String>,

    /// Number of transfer retries performed.
    pub retry_count: u32,

    /// Why the payout was cancelled, when it was.
    pub cancel_reason: Option<String>,
}

impl Payout {
    /// Creates a pending payout from a commission split.
    pub fn create(
        order_id: OrderId,
        seller_id: SellerId,
        gross_amount: Money,
        split: CommissionBreakdown,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PayoutId::new(),
            order_id,
            seller_id,
            gross_amount,
            commission: split.commission,
            net_amount: split.net,
            currency: currency.into(),
            status: PayoutStatus::Pending,
            created_at: now,
            paid_at: None,
            provider_ref: None,
            last_error: None,
            retry_count: 0,
            cancel_reason: None,
        }
    }

    /// Cancels a pending payout.
    ///
    /// Only `Pending` payouts can be cancelled; `Paid` and `Failed` payouts
    /// are left for manual reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the payout is not pending.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(PayoutStatus::Canceled)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.cancel_reason = Some(reason.into());
        Ok(())
    }

    /// Marks the payout as transferred (external payout processor).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the payout cannot be paid.
    pub fn mark_paid(
        &mut self,
        provider_ref: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(PayoutStatus::Paid)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.provider_ref = Some(provider_ref.into());
        self.paid_at = Some(now);
        Ok(())
    }

    /// Records a failed transfer attempt (external payout processor).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the payout cannot fail.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(PayoutStatus::Failed)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.last_error = Some(error.into());
        Ok(())
    }

    /// Begins a retry of a failed transfer (external payout processor).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the payout is not failed.
    pub fn mark_retrying(&mut self) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(PayoutStatus::Retrying)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.retry_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settlement::CommissionCalculator;

    fn pending_payout() -> Payout {
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
    fn create_produces_pending_with_exact_split() {
        let payout = pending_payout();
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert_eq!(payout.commission + payout.net_amount, payout.gross_amount);
        assert_eq!(payout.retry_count, 0);
    }

    #[test]
    fn cancel_pending_records_reason() {
        let mut payout = pending_payout();
        payout.cancel("order_refunded").unwrap();
        assert_eq!(payout.status, PayoutStatus::Canceled);
        assert_eq!(payout.cancel_reason.as_deref(), Some("order_refunded"));
    }

    #[test]
    fn cancel_paid_is_rejected() {
        let mut payout = pending_payout();
        payout.mark_paid("po_123", Timestamp::now()).unwrap();

        let result = payout.cancel("order_refunded");

        assert!(result.is_err());
        assert_eq!(payout.status, PayoutStatus::Paid);
    }

    #[test]
    fn mark_paid_stamps_reference_and_time() {
        let mut payout = pending_payout();
        payout.mark_paid("po_123", Timestamp::now()).unwrap();
        assert_eq!(payout.provider_ref.as_deref(), Some("po_123"));
        assert!(payout.paid_at.is_some());
    }

    #[test]
    fn failed_payout_can_retry_then_pay() {
        let mut payout = pending_payout();
        payout.mark_failed("insufficient balance").unwrap();
        assert_eq!(payout.status, PayoutStatus::Failed);

        payout.mark_retrying().unwrap();
        assert_eq!(payout.retry_count, 1);

        payout.mark_paid("po_retry", Timestamp::now()).unwrap();
        assert_eq!(payout.status, PayoutStatus::Paid);
    }

    #[test]
    fn canceled_is_terminal() {
        let mut payout = pending_payout();
        payout.cancel("order_refunded").unwrap();
        assert!(payout.mark_paid("po_1", Timestamp::now()).is_err());
        assert!(payout.mark_failed("nope").is_err());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            PayoutStatus::Pending,
            PayoutStatus::Paid,
            PayoutStatus::Failed,
            PayoutStatus::Retrying,
            PayoutStatus::Canceled,
        ] {
            assert_eq!(PayoutStatus::parse(status.as_str()), Some(status));
        }
    }
}
