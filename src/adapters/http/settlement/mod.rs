//! Settlement HTTP module - webhook ingress and payout reporting API.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{SettlementApiError, SettlementAppState};
pub use routes::{payout_routes, settlement_router, webhook_routes};
