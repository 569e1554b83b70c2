//! Settlement domain - commissions, payouts, and provider events.

mod commission;
mod errors;
mod fanout;
mod payout;
mod provider_event;

pub use commission::{
    CommissionBreakdown, CommissionCalculator, DEFAULT_COMMISSION_RATE_BPS,
};
pub use errors::SettlementError;
pub use fanout::{plan_payouts, PayoutDraft};
pub use payout::{Payout, PayoutStatus};
pub use provider_event::{
    ChargePayload, PaymentIntentPayload, ProviderEvent, ProviderEventType,
};
