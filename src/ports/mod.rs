//! Ports - interfaces between the domain and the outside world.
//!
//! Adapters implement these traits; application handlers depend on the
//! traits only.

mod order_repository;
mod payout_reader;
mod payout_repository;
mod processed_event_store;
mod webhook_verifier;

pub use order_repository::OrderRepository;
pub use payout_reader::{
    FailureReason, MonthlyTrend, PayoutReader, PerformanceMetrics, SellerVolume, StatusBreakdown,
};
pub use payout_repository::{InsertOutcome, PayoutRepository};
pub use processed_event_store::{
    ClaimOutcome, EventStatus, ProcessedEvent, ProcessedEventStore, DEFAULT_CLAIM_LEASE_SECS,
};
pub use webhook_verifier::WebhookVerifier;
