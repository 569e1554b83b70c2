//! In-memory implementations of the persistence ports.
//!
//! Provides synchronous, deterministic storage for unit and integration
//! tests.
//!
//! # Security Note
//!
//! These adapters are for **testing only** and should not be used in
//! production. They use `.expect()` on lock operations which will panic if
//! locks are poisoned. Production code uses the Postgres adapters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::{DomainError, Money, OrderId, SellerId, Timestamp};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::settlement::{Payout, PayoutStatus};
use crate::ports::{
    ClaimOutcome, EventStatus, FailureReason, InsertOutcome, MonthlyTrend, OrderRepository,
    PayoutReader, PayoutRepository, PerformanceMetrics, ProcessedEvent, ProcessedEventStore,
    SellerVolume, StatusBreakdown, DEFAULT_CLAIM_LEASE_SECS,
};

// ════════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory order store for testing.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given orders.
    pub fn with_orders(orders: Vec<Order>) -> Self {
        let map = orders.into_iter().map(|o| (o.id, o)).collect();
        Self {
            orders: RwLock::new(map),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), DomainError> {
        self.orders
            .write()
            .expect("InMemoryOrderRepository: lock poisoned")
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .read()
            .expect("InMemoryOrderRepository: lock poisoned")
            .get(id)
            .cloned())
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_ref: &str,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .read()
            .expect("InMemoryOrderRepository: lock poisoned")
            .values()
            .find(|o| o.payment_intent_ref.as_deref() == Some(payment_intent_ref))
            .cloned())
    }

    async fn update_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, DomainError> {
        let mut orders = self
            .orders
            .write()
            .expect("InMemoryOrderRepository: lock poisoned");
        match orders.get_mut(&order.id) {
            Some(stored) if stored.status == expected => {
                *stored = order.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payouts
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory payout store for testing.
#[derive(Default)]
pub struct InMemoryPayoutRepository {
    payouts: RwLock<Vec<Payout>>,
}

impl InMemoryPayoutRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every stored payout (test assertions and the
    /// in-memory reader).
    pub fn snapshot(&self) -> Vec<Payout> {
        self.payouts
            .read()
            .expect("InMemoryPayoutRepository: lock poisoned")
            .clone()
    }
}

#[async_trait]
impl PayoutRepository for InMemoryPayoutRepository {
    async fn insert(&self, payout: &Payout) -> Result<InsertOutcome, DomainError> {
        let mut payouts = self
            .payouts
            .write()
            .expect("InMemoryPayoutRepository: lock poisoned");
        let exists = payouts
            .iter()
            .any(|p| p.order_id == payout.order_id && p.seller_id == payout.seller_id);
        if exists {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            payouts.push(payout.clone());
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn find_by_order_and_seller(
        &self,
        order_id: &OrderId,
        seller_id: &SellerId,
    ) -> Result<Option<Payout>, DomainError> {
        Ok(self
            .payouts
            .read()
            .expect("InMemoryPayoutRepository: lock poisoned")
            .iter()
            .find(|p| &p.order_id == order_id && &p.seller_id == seller_id)
            .cloned())
    }

    async fn list_by_order(&self, order_id: &OrderId) -> Result<Vec<Payout>, DomainError> {
        Ok(self
            .payouts
            .read()
            .expect("InMemoryPayoutRepository: lock poisoned")
            .iter()
            .filter(|p| &p.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update(&self, payout: &Payout) -> Result<(), DomainError> {
        let mut payouts = self
            .payouts
            .write()
            .expect("InMemoryPayoutRepository: lock poisoned");
        if let Some(stored) = payouts.iter_mut().find(|p| p.id == payout.id) {
            *stored = payout.clone();
        }
        Ok(())
    }

    async fn cancel_pending_for_order(
        &self,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<u64, DomainError> {
        let mut payouts = self
            .payouts
            .write()
            .expect("InMemoryPayoutRepository: lock poisoned");
        let mut cancelled = 0u64;
        for payout in payouts
            .iter_mut()
            .filter(|p| &p.order_id == order_id && p.status == PayoutStatus::Pending)
        {
            payout.cancel(reason)?;
            cancelled += 1;
        }
        Ok(cancelled)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Processed Events
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory idempotency ledger for testing.
pub struct InMemoryProcessedEventStore {
    events: RwLock<HashMap<String, ProcessedEvent>>,
    claim_lease_secs: u64,
}

impl InMemoryProcessedEventStore {
    /// Creates an empty ledger with the default claim lease.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            claim_lease_secs: DEFAULT_CLAIM_LEASE_SECS,
        }
    }

    /// Overrides the claim lease (tests exercising reclaim).
    pub fn with_claim_lease_secs(mut self, secs: u64) -> Self {
        self.claim_lease_secs = secs;
        self
    }
}

impl Default for InMemoryProcessedEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn claim(&self, event_id: &str, event_type: &str) -> Result<ClaimOutcome, DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryProcessedEventStore: lock poisoned");
        let now = Timestamp::now();

        match events.get_mut(event_id) {
            None => {
                events.insert(
                    event_id.to_string(),
                    ProcessedEvent {
                        id: event_id.to_string(),
                        event_type: event_type.to_string(),
                        status: EventStatus::Processing,
                        received_at: now,
                        processed_at: None,
                        error: None,
                    },
                );
                Ok(ClaimOutcome::Claimed)
            }
            Some(existing) => {
                let lease_expired = existing.received_at
                    < now.minus_secs(self.claim_lease_secs);
                let reclaimable = existing.status == EventStatus::Failed
                    || (existing.status == EventStatus::Processing && lease_expired);
                if reclaimable {
                    existing.status = EventStatus::Processing;
                    existing.received_at = now;
                    existing.error = None;
                    Ok(ClaimOutcome::Claimed)
                } else {
                    Ok(ClaimOutcome::AlreadyClaimed)
                }
            }
        }
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryProcessedEventStore: lock poisoned");
        if let Some(event) = events.get_mut(event_id) {
            event.status = EventStatus::Processed;
            event.processed_at = Some(Timestamp::now());
            event.error = None;
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryProcessedEventStore: lock poisoned");
        if let Some(event) = events.get_mut(event_id) {
            event.status = EventStatus::Failed;
            event.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        Ok(self
            .events
            .read()
            .expect("InMemoryProcessedEventStore: lock poisoned")
            .get(event_id)
            .cloned())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut events = self
            .events
            .write()
            .expect("InMemoryProcessedEventStore: lock poisoned");
        let before = events.len();
        events.retain(|_, e| e.received_at >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payout Reader
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory reporting reader over an [`InMemoryPayoutRepository`].
pub struct InMemoryPayoutReader {
    repository: Arc<InMemoryPayoutRepository>,
}

impl InMemoryPayoutReader {
    /// Creates a reader over the given payout store.
    pub fn new(repository: Arc<InMemoryPayoutRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl PayoutReader for InMemoryPayoutReader {
    async fn totals_by_status(&self) -> Result<Vec<StatusBreakdown>, DomainError> {
        let payouts = self.repository.snapshot();
        let statuses = [
            PayoutStatus::Pending,
            PayoutStatus::Paid,
            PayoutStatus::Failed,
            PayoutStatus::Retrying,
            PayoutStatus::Canceled,
        ];

        Ok(statuses
            .into_iter()
            .filter_map(|status| {
                let matching: Vec<&Payout> =
                    payouts.iter().filter(|p| p.status == status).collect();
                if matching.is_empty() {
                    return None;
                }
                Some(StatusBreakdown {
                    status,
                    count: matching.len() as u64,
                    net_total: matching.iter().map(|p| p.net_amount).sum(),
                })
            })
            .collect())
    }

    async fn top_sellers(&self, limit: u32) -> Result<Vec<SellerVolume>, DomainError> {
        let payouts = self.repository.snapshot();
        let mut volumes: Vec<SellerVolume> = Vec::new();

        for payout in payouts.iter().filter(|p| p.status == PayoutStatus::Paid) {
            match volumes
                .iter_mut()
                .find(|v| v.seller_id == payout.seller_id)
            {
                Some(v) => {
                    v.paid_count += 1;
                    v.paid_net_total += payout.net_amount;
                }
                None => volumes.push(SellerVolume {
                    seller_id: payout.seller_id.clone(),
                    paid_count: 1,
                    paid_net_total: payout.net_amount,
                }),
            }
        }

        volumes.sort_by(|a, b| b.paid_net_total.cmp(&a.paid_net_total));
        volumes.truncate(limit as usize);
        Ok(volumes)
    }

    async fn monthly_trends(&self, months: u32) -> Result<Vec<MonthlyTrend>, DomainError> {
        let payouts = self.repository.snapshot();
        let mut buckets: HashMap<String, MonthlyTrend> = HashMap::new();

        for payout in &payouts {
            let created_month = payout.created_at.month_key();
            let entry = buckets
                .entry(created_month.clone())
                .or_insert_with(|| MonthlyTrend {
                    month: created_month,
                    created_count: 0,
                    paid_count: 0,
                    paid_net_total: Money::ZERO,
                });
            entry.created_count += 1;

            if let Some(paid_at) = payout.paid_at {
                let paid_month = paid_at.month_key();
                let entry = buckets
                    .entry(paid_month.clone())
                    .or_insert_with(|| MonthlyTrend {
                        month: paid_month,
                        created_count: 0,
                        paid_count: 0,
                        paid_net_total: Money::ZERO,
                    });
                entry.paid_count += 1;
                entry.paid_net_total += payout.net_amount;
            }
        }

        let mut trends: Vec<MonthlyTrend> = buckets.into_values().collect();
        trends.sort_by(|a, b| a.month.cmp(&b.month));
        if trends.len() > months as usize {
            trends.drain(..trends.len() - months as usize);
        }
        Ok(trends)
    }

    async fn performance(&self, window_days: u32) -> Result<PerformanceMetrics, DomainError> {
        let payouts = self.repository.snapshot();
        let cutoff = Timestamp::now().minus_days(i64::from(window_days));

        let paid: Vec<&Payout> = payouts
            .iter()
            .filter(|p| p.paid_at.map(|t| t >= cutoff).unwrap_or(false))
            .collect();
        let failed: Vec<&Payout> = payouts
            .iter()
            .filter(|p| p.status == PayoutStatus::Failed && p.created_at >= cutoff)
            .collect();

        let paid_count = paid.len() as u64;
        let failed_count = failed.len() as u64;
        let outcomes = paid_count + failed_count;
        let success_rate = (outcomes > 0).then(|| paid_count as f64 / outcomes as f64);

        let avg_settlement_secs = (!paid.is_empty()).then(|| {
            let total: i64 = paid
                .iter()
                .filter_map(|p| {
                    p.paid_at
                        .map(|t| t.duration_since(&p.created_at).num_seconds())
                })
                .sum();
            total as f64 / paid.len() as f64
        });

        let mut failure_reasons: Vec<FailureReason> = Vec::new();
        for payout in &failed {
            let reason = payout
                .last_error
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            match failure_reasons.iter_mut().find(|f| f.reason == reason) {
                Some(f) => f.count += 1,
                None => failure_reasons.push(FailureReason { reason, count: 1 }),
            }
        }
        failure_reasons.sort_by(|a, b| b.count.cmp(&a.count));

        let retried: Vec<&Payout> = payouts
            .iter()
            .filter(|p| p.retry_count > 0 && p.created_at >= cutoff)
            .collect();
        let retry_success_rate = (!retried.is_empty()).then(|| {
            let succeeded = retried
                .iter()
                .filter(|p| p.status == PayoutStatus::Paid)
                .count();
            succeeded as f64 / retried.len() as f64
        });

        Ok(PerformanceMetrics {
            window_days,
            paid_count,
            failed_count,
            success_rate,
            avg_settlement_secs,
            failure_reasons,
            retry_success_rate,
        })
    }

    async fn export_all(&self) -> Result<Vec<Payout>, DomainError> {
        let mut payouts = self.repository.snapshot();
        payouts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(payouts)
    }
}
