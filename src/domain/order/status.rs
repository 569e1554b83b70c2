//! Order status state machine.
//!
//! Defines all possible order states and valid transitions across the
//! checkout, fulfillment, and settlement lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Settlement drives `PendingPayment -> Paid -> Refunded` and the
/// `PaymentFailed` branch; fulfillment transitions (`Confirmed`, `Shipped`,
/// `Delivered`) and seller/admin decisions (`Cancelled`, `Rejected`) are
/// driven by endpoints outside the settlement core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Checkout initiated, awaiting payment confirmation.
    PendingPayment,

    /// Payment confirmed by the provider.
    Paid,

    /// Payment attempt failed. The buyer may start a new checkout.
    PaymentFailed,

    /// All sellers confirmed the order.
    Confirmed,

    /// Order handed to the carrier.
    Shipped,

    /// Order received by the buyer.
    Delivered,

    /// Cancelled by buyer or admin before fulfillment.
    Cancelled,

    /// Rejected by a seller.
    Rejected,

    /// Payment refunded. Terminal.
    Refunded,
}

impl OrderStatus {
    /// Returns the wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses the wire/database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(OrderStatus::PendingPayment),
            "paid" => Some(OrderStatus::Paid),
            "payment_failed" => Some(OrderStatus::PaymentFailed),
            "confirmed" => Some(OrderStatus::Confirmed),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "rejected" => Some(OrderStatus::Rejected),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Returns true once payment has been applied (Paid or any later
    /// forward state reached through it).
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Confirmed
                | OrderStatus::Shipped
                | OrderStatus::Delivered
                | OrderStatus::Refunded
        )
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            // From PENDING_PAYMENT
            (PendingPayment, Paid)
                | (PendingPayment, PaymentFailed)
                | (PendingPayment, Cancelled)
                | (PendingPayment, Rejected)
            // From PAID
                | (Paid, PaymentFailed)
                | (Paid, Confirmed)
                | (Paid, Refunded)
            // Fulfillment chain
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Confirmed, Rejected)
                | (Shipped, Delivered)
            // Refunds can land after fulfillment has progressed
                | (Confirmed, Refunded)
                | (Shipped, Refunded)
                | (Delivered, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            PendingPayment => vec![Paid, PaymentFailed, Cancelled, Rejected],
            Paid => vec![PaymentFailed, Confirmed, Refunded],
            PaymentFailed => vec![],
            Confirmed => vec![Shipped, Cancelled, Rejected, Refunded],
            Shipped => vec![Delivered, Refunded],
            Delivered => vec![Refunded],
            Cancelled => vec![],
            Rejected => vec![],
            Refunded => vec![],
        }
    }
}
