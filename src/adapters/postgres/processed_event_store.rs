//! PostgreSQL implementation of ProcessedEventStore.
//!
//! The claim is an `INSERT ... ON CONFLICT DO NOTHING` on the event id
//! primary key: the database constraint, not a check-then-insert, decides
//! the race between concurrent deliveries. A conflict falls through to a
//! guarded reclaim of `failed` records and of `processing` records whose
//! lease has expired.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{
    ClaimOutcome, EventStatus, ProcessedEvent, ProcessedEventStore, DEFAULT_CLAIM_LEASE_SECS,
};

/// PostgreSQL implementation of the ProcessedEventStore port.
pub struct PostgresProcessedEventStore {
    pool: PgPool,
    claim_lease_secs: u64,
}

impl PostgresProcessedEventStore {
    /// Creates a new store with the default claim lease.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            claim_lease_secs: DEFAULT_CLAIM_LEASE_SECS,
        }
    }

    /// Overrides the claim lease.
    pub fn with_claim_lease_secs(mut self, secs: u64) -> Self {
        self.claim_lease_secs = secs;
        self
    }
}

/// Database row representation of a ledger record.
#[derive(Debug, sqlx::FromRow)]
struct ProcessedEventRow {
    id: String,
    event_type: String,
    status: String,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl TryFrom<ProcessedEventRow> for ProcessedEvent {
    type Error = DomainError;

    fn try_from(row: ProcessedEventRow) -> Result<Self, Self::Error> {
        let status = EventStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid event status value: {}", row.status),
            )
        })?;

        Ok(ProcessedEvent {
            id: row.id,
            event_type: row.event_type,
            status,
            received_at: Timestamp::from_datetime(row.received_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            error: row.error,
        })
    }
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn claim(&self, event_id: &str, event_type: &str) -> Result<ClaimOutcome, DomainError> {
        // 1. Fresh id: the unique insert decides the race.
        let inserted = sqlx::query(
            r#"
            INSERT INTO processed_events (id, event_type, status, received_at)
            VALUES ($1, $2, 'processing', NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to claim event: {}", e),
            )
        })?;

        if inserted.rows_affected() > 0 {
            return Ok(ClaimOutcome::Claimed);
        }

        // 2. Known id: reclaim only failed runs and expired leases.
        let reclaimed = sqlx::query(
            r#"
            UPDATE processed_events SET
                status = 'processing',
                received_at = NOW(),
                error = NULL
            WHERE id = $1
              AND (
                  status = 'failed'
                  OR (status = 'processing' AND received_at < NOW() - ($2 * INTERVAL '1 second'))
              )
            "#,
        )
        .bind(event_id)
        .bind(self.claim_lease_secs as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to reclaim event: {}", e),
            )
        })?;

        if reclaimed.rows_affected() > 0 {
            Ok(ClaimOutcome::Claimed)
        } else {
            Ok(ClaimOutcome::AlreadyClaimed)
        }
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE processed_events SET
                status = 'processed',
                processed_at = NOW(),
                error = NULL
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark event processed: {}", e),
            )
        })?;

        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE processed_events SET
                status = 'failed',
                error = $2
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark event failed: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        let row: Option<ProcessedEventRow> = sqlx::query_as(
            r#"
            SELECT id, event_type, status, received_at, processed_at, error
            FROM processed_events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find event: {}", e),
            )
        })?;

        row.map(ProcessedEvent::try_from).transpose()
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM processed_events
            WHERE received_at < $1 AND status = 'processed'
            "#,
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to delete events: {}", e),
            )
        })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_record() {
        let row = ProcessedEventRow {
            id: "evt_1".to_string(),
            event_type: "payment_intent.succeeded".to_string(),
            status: "processed".to_string(),
            received_at: Utc::now(),
            processed_at: Some(Utc::now()),
            error: None,
        };

        let record = ProcessedEvent::try_from(row).unwrap();

        assert_eq!(record.status, EventStatus::Processed);
        assert!(record.processed_at.is_some());
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let row = ProcessedEventRow {
            id: "evt_1".to_string(),
            event_type: "t".to_string(),
            status: "paused".to_string(),
            received_at: Utc::now(),
            processed_at: None,
            error: None,
        };

        assert!(ProcessedEvent::try_from(row).is_err());
    }
}
