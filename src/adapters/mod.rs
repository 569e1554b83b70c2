//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - Webhook signature verification for the payment provider
//! - `postgres` - Database-backed persistence
//! - `memory` - In-memory stores for tests
//! - `http` - Axum routers and handlers

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
