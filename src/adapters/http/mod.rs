//! HTTP adapters - Axum routers, handlers, and DTOs.

pub mod settlement;
