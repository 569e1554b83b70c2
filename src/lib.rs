//! Vendora - Multi-vendor marketplace payment settlement service
//!
//! This crate implements the settlement core of the marketplace: webhook
//! ingestion from the payment provider, exactly-once reconciliation of
//! order state, commission-adjusted payout fan-out to sellers, refund
//! reversal, and read-only payout reporting.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
