//! Payout fan-out planning.
//!
//! Splitting one order's payment confirmation into per-seller payout drafts
//! is a pure computation: group items by seller, sum `price * quantity`,
//! apply the commission. The handler turns drafts into stored payouts, with
//! an existence check per seller making the insert re-entrant.

use crate::domain::foundation::{Money, SellerId};
use crate::domain::order::OrderItem;

use super::{CommissionBreakdown, CommissionCalculator};

/// One seller's share of an order, commission already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutDraft {
    /// Seller this draft settles.
    pub seller_id: SellerId,

    /// Seller-attributable revenue before commission.
    pub gross: Money,

    /// Commission split of the gross amount.
    pub split: CommissionBreakdown,
}

/// Plans per-seller payout drafts for an order's items.
///
/// Sellers appear in first-occurrence order. Every seller in the items gets
/// exactly one draft.
pub fn plan_payouts(items: &[OrderItem], calculator: &CommissionCalculator) -> Vec<PayoutDraft> {
    let mut totals: Vec<(SellerId, Money)> = Vec::new();

    for item in items {
        match totals.iter_mut().find(|(seller, _)| seller == &item.seller_id) {
            Some((_, gross)) => *gross += item.line_total(),
            None => totals.push((item.seller_id.clone(), item.line_total())),
        }
    }

    totals
        .into_iter()
        .map(|(seller_id, gross)| PayoutDraft {
            seller_id,
            gross,
            split: calculator.calculate(gross),
        })
        .collect()
}
