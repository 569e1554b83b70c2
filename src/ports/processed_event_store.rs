//! ProcessedEventStore port - the webhook idempotency ledger.
//!
//! The provider delivers webhooks at-least-once and out of order. The
//! ledger's unique insert on the provider event id is the system's sole
//! cross-handler coordination primitive: exactly one concurrent delivery of
//! an event id wins the claim and runs the handler, every other delivery
//! observes the conflict and acknowledges without doing work.
//!
//! ## Claim lifecycle
//!
//! - A first-seen id is inserted as `processing` and the caller owns it.
//! - `processed` records are never claimable again.
//! - `failed` records ARE claimable: the handler threw, the provider will
//!   redeliver, and every downstream mutation is itself idempotent, so the
//!   re-run is safe and forward progress is guaranteed.
//! - `processing` records older than the claim lease are claimable too; a
//!   crashed handler must not block its event id forever.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Default claim lease: a `processing` record older than this is treated
/// as abandoned by a crashed handler and may be reclaimed.
pub const DEFAULT_CLAIM_LEASE_SECS: u64 = 300;

/// Processing status of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Claimed; a handler run is (or was) in flight.
    Processing,

    /// Handler completed. The id is permanently settled.
    Processed,

    /// Handler threw. Claimable again on redelivery.
    Failed,
}

impl EventStatus {
    /// Returns the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Processing => "processing",
            EventStatus::Processed => "processed",
            EventStatus::Failed => "failed",
        }
    }

    /// Parses the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(EventStatus::Processing),
            "processed" => Some(EventStatus::Processed),
            "failed" => Some(EventStatus::Failed),
            _ => None,
        }
    }
}

/// A ledger record for one provider event id.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    /// Provider event id. Primary key and idempotency key.
    pub id: String,

    /// Raw provider event type string.
    pub event_type: String,

    /// Current processing status.
    pub status: EventStatus,

    /// When the id was first claimed (refreshed on reclaim).
    pub received_at: Timestamp,

    /// When the handler completed, if it has.
    pub processed_at: Option<Timestamp>,

    /// Handler error message, when the last run failed.
    pub error: Option<String>,
}

/// Outcome of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller owns processing of the event.
    Claimed,

    /// The event is settled or another handler holds a live claim.
    AlreadyClaimed,
}

/// Port for the webhook dedup ledger.
///
/// Implementations must make `claim` race-safe: two concurrent claims of
/// the same new id must resolve to exactly one `Claimed` (database unique
/// constraint, not check-then-insert).
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Attempts to claim an event id for processing.
    async fn claim(&self, event_id: &str, event_type: &str) -> Result<ClaimOutcome, DomainError>;

    /// Marks a claimed event as successfully processed.
    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError>;

    /// Marks a claimed event as failed with the handler error.
    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError>;

    /// Looks up a ledger record.
    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError>;

    /// Deletes records older than the cutoff (retention policy).
    ///
    /// Returns the number of records deleted.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
