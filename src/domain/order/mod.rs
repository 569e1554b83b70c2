//! Order domain - the payment-relevant view of a checkout.

mod aggregate;
mod status;

pub use aggregate::{Order, OrderItem, SettleOutcome};
pub use status::OrderStatus;
