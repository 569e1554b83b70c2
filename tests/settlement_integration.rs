//! Integration tests for the settlement core.
//!
//! These tests run the full webhook path - real HMAC signature
//! verification, the dedup ledger claim, order transitions, payout
//! fan-out, and refund reversal - against in-memory stores, so the
//! exactly-once behavior is exercised without external dependencies.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use vendora::adapters::http::settlement::dto::{payouts_to_csv, PAYOUT_CSV_HEADER};
use vendora::adapters::memory::{
    InMemoryOrderRepository, InMemoryPayoutReader, InMemoryPayoutRepository,
    InMemoryProcessedEventStore,
};
use vendora::adapters::stripe::{hex_encode, StripeWebhookConfig, StripeWebhookVerifier};
use vendora::application::handlers::settlement::{
    ProcessWebhookCommand, ProcessWebhookHandler, WebhookOutcome,
};
use vendora::domain::foundation::{Money, OrderId, SellerId, Timestamp};
use vendora::domain::order::{Order, OrderItem, OrderStatus};
use vendora::domain::settlement::{CommissionCalculator, PayoutStatus, SettlementError};
use vendora::ports::{OrderRepository, PayoutReader, PayoutRepository, ProcessedEventStore};

const WEBHOOK_SECRET: &str = "whsec_integration_secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    orders: Arc<InMemoryOrderRepository>,
    payouts: Arc<InMemoryPayoutRepository>,
    ledger: Arc<InMemoryProcessedEventStore>,
    handler: ProcessWebhookHandler,
}

impl Harness {
    fn new() -> Self {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payouts = Arc::new(InMemoryPayoutRepository::new());
        let ledger = Arc::new(InMemoryProcessedEventStore::new());

        let verifier = StripeWebhookVerifier::new(StripeWebhookConfig::new(WEBHOOK_SECRET));
        let handler = ProcessWebhookHandler::new(
            Arc::new(verifier),
            ledger.clone(),
            orders.clone(),
            payouts.clone(),
            CommissionCalculator::default(),
        );

        Self {
            orders,
            payouts,
            ledger,
            handler,
        }
    }

    /// Delivers a payload signed with the real webhook secret.
    async fn deliver(&self, payload: &str) -> Result<WebhookOutcome, SettlementError> {
        self.deliver_signed(payload, WEBHOOK_SECRET).await
    }

    async fn deliver_signed(
        &self,
        payload: &str,
        secret: &str,
    ) -> Result<WebhookOutcome, SettlementError> {
        let cmd = ProcessWebhookCommand {
            payload: payload.as_bytes().to_vec(),
            signature: sign(secret, payload),
        };
        self.handler.handle(cmd).await
    }
}

/// Signs a payload the way the provider does: HMAC-SHA256 over
/// `"{timestamp}.{body}"`, delivered as `t=...,v1=...`.
fn sign(secret: &str, payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    let signature = mac.finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex_encode(&signature))
}

fn seller(id: &str) -> SellerId {
    SellerId::new(id).unwrap()
}

/// Scenario A order: items [{sellerA, 100, qty 2}, {sellerB, 50, qty 1}].
fn two_seller_order() -> Order {
    Order::new(
        OrderId::new(),
        vec![
            OrderItem::new(seller("seller-a"), Money::from_major(100), 2).unwrap(),
            OrderItem::new(seller("seller-b"), Money::from_major(50), 1).unwrap(),
        ],
        "usd",
    )
    .unwrap()
}

fn succeeded_payload(event_id: &str, order: &Order) -> String {
    json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "id": "pi_integration_1",
                "amount": order.total_price.minor(),
                "currency": order.currency,
                "metadata": {"order_id": order.id.to_string()}
            }
        },
        "livemode": false,
        "pending_webhooks": 1
    })
    .to_string()
}

fn failed_payload(event_id: &str, order: &Order) -> String {
    json!({
        "id": event_id,
        "type": "payment_intent.payment_failed",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "id": "pi_integration_1",
                "amount": order.total_price.minor(),
                "currency": order.currency,
                "metadata": {"order_id": order.id.to_string()}
            }
        },
        "livemode": false,
        "pending_webhooks": 1
    })
    .to_string()
}

fn refunded_payload(event_id: &str) -> String {
    json!({
        "id": event_id,
        "type": "charge.refunded",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "id": "ch_integration_1",
                "payment_intent": "pi_integration_1",
                "amount_refunded": 25000
            }
        },
        "livemode": false,
        "pending_webhooks": 1
    })
    .to_string()
}

// =============================================================================
// Settlement Scenarios
// =============================================================================

#[tokio::test]
async fn payment_succeeded_settles_order_and_creates_payouts() {
    let harness = Harness::new();
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();

    let outcome = harness
        .deliver(&succeeded_payload("evt_a", &order))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::Processed);

    let stored = harness.orders.find_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
    assert_eq!(stored.payment_intent_ref.as_deref(), Some("pi_integration_1"));

    let payouts = harness.payouts.list_by_order(&order.id).await.unwrap();
    assert_eq!(payouts.len(), 2);

    let a = payouts
        .iter()
        .find(|p| p.seller_id.as_str() == "seller-a")
        .unwrap();
    assert_eq!(a.gross_amount, Money::from_major(200));
    assert_eq!(a.commission, Money::from_major(20));
    assert_eq!(a.net_amount, Money::from_major(180));
    assert_eq!(a.status, PayoutStatus::Pending);

    let b = payouts
        .iter()
        .find(|p| p.seller_id.as_str() == "seller-b")
        .unwrap();
    assert_eq!(b.gross_amount, Money::from_major(50));
    assert_eq!(b.commission, Money::from_major(5));
    assert_eq!(b.net_amount, Money::from_major(45));
    assert_eq!(b.status, PayoutStatus::Pending);
}

#[tokio::test]
async fn redelivered_event_reports_idempotent_and_creates_nothing() {
    let harness = Harness::new();
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();
    let payload = succeeded_payload("evt_b", &order);

    assert_eq!(
        harness.deliver(&payload).await.unwrap(),
        WebhookOutcome::Processed
    );
    assert_eq!(
        harness.deliver(&payload).await.unwrap(),
        WebhookOutcome::Idempotent
    );

    // Still exactly one order transition and two payouts, not four.
    assert_eq!(harness.payouts.list_by_order(&order.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn payment_failed_marks_order_without_payouts() {
    let harness = Harness::new();
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();

    let outcome = harness
        .deliver(&failed_payload("evt_c", &order))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::Processed);
    let stored = harness.orders.find_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::PaymentFailed);
    assert!(harness.payouts.list_by_order(&order.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn refund_reverses_pending_payouts() {
    let harness = Harness::new();
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();

    harness
        .deliver(&succeeded_payload("evt_pay", &order))
        .await
        .unwrap();
    let outcome = harness.deliver(&refunded_payload("evt_refund")).await.unwrap();

    assert_eq!(outcome, WebhookOutcome::Processed);
    let stored = harness.orders.find_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Refunded);
    assert!(stored.refunded_at.is_some());

    let payouts = harness.payouts.list_by_order(&order.id).await.unwrap();
    assert_eq!(payouts.len(), 2);
    for payout in &payouts {
        assert_eq!(payout.status, PayoutStatus::Canceled);
        assert_eq!(payout.cancel_reason.as_deref(), Some("order_refunded"));
    }
}

#[tokio::test]
async fn refund_leaves_paid_payout_untouched() {
    let harness = Harness::new();
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();
    harness
        .deliver(&succeeded_payload("evt_pay", &order))
        .await
        .unwrap();

    // The out-of-scope transfer step pays seller A before the refund lands.
    let payouts = harness.payouts.list_by_order(&order.id).await.unwrap();
    let mut paid = payouts
        .iter()
        .find(|p| p.seller_id.as_str() == "seller-a")
        .unwrap()
        .clone();
    paid.mark_paid("po_transfer_1", Timestamp::now()).unwrap();
    harness.payouts.update(&paid).await.unwrap();

    harness.deliver(&refunded_payload("evt_refund")).await.unwrap();

    let payouts = harness.payouts.list_by_order(&order.id).await.unwrap();
    let a = payouts
        .iter()
        .find(|p| p.seller_id.as_str() == "seller-a")
        .unwrap();
    let b = payouts
        .iter()
        .find(|p| p.seller_id.as_str() == "seller-b")
        .unwrap();
    assert_eq!(a.status, PayoutStatus::Paid);
    assert!(a.cancel_reason.is_none());
    assert_eq!(b.status, PayoutStatus::Canceled);
}

// =============================================================================
// Ordering and Ingress Edge Cases
// =============================================================================

#[tokio::test]
async fn refund_before_settlement_is_skipped_then_payment_still_settles() {
    let harness = Harness::new();
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();

    // Out-of-order delivery: the refund arrives before the succeeded event
    // stored any payment reference, so no order matches.
    let outcome = harness.deliver(&refunded_payload("evt_refund")).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::Ignored);

    // The later succeeded event settles normally.
    let outcome = harness
        .deliver(&succeeded_payload("evt_pay", &order))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Processed);
    let stored = harness.orders.find_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
}

#[tokio::test]
async fn tampered_signature_is_rejected_without_mutation() {
    let harness = Harness::new();
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();
    let payload = succeeded_payload("evt_x", &order);

    let result = harness.deliver_signed(&payload, "whsec_wrong_secret").await;

    assert!(matches!(result, Err(SettlementError::InvalidSignature(_))));
    let stored = harness.orders.find_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::PendingPayment);
    assert!(harness.ledger.find("evt_x").await.unwrap().is_none());
}

#[tokio::test]
async fn unsupported_event_type_is_acknowledged_as_noop() {
    let harness = Harness::new();
    let payload = json!({
        "id": "evt_noise",
        "type": "customer.subscription.updated",
        "created": chrono::Utc::now().timestamp(),
        "data": {"object": {"id": "sub_1"}},
        "livemode": false
    })
    .to_string();

    let outcome = harness.deliver(&payload).await.unwrap();

    assert_eq!(outcome, WebhookOutcome::Ignored);
    assert!(harness.ledger.find("evt_noise").await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_deliveries_of_same_event_settle_once() {
    let harness = Arc::new(Harness::new());
    let order = two_seller_order();
    harness.orders.save(&order).await.unwrap();
    let payload = succeeded_payload("evt_race", &order);

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let harness = harness.clone();
            let payload = payload.clone();
            tokio::spawn(async move { harness.deliver(&payload).await })
        })
        .collect();

    let mut processed = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() == WebhookOutcome::Processed {
            processed += 1;
        }
    }

    assert_eq!(processed, 1);
    assert_eq!(harness.payouts.list_by_order(&order.id).await.unwrap().len(), 2);
}

// =============================================================================
// Reporting Cross-Check
// =============================================================================

#[tokio::test]
async fn reporting_aggregates_match_the_settled_ledger() {
    let harness = Harness::new();

    // Settle two orders, pay one payout, refund nothing.
    let first = two_seller_order();
    let second = Order::new(
        OrderId::new(),
        vec![OrderItem::new(seller("seller-c"), Money::from_major(30), 1).unwrap()],
        "usd",
    )
    .unwrap();
    harness.orders.save(&first).await.unwrap();
    harness.orders.save(&second).await.unwrap();

    harness
        .deliver(&succeeded_payload("evt_1", &first))
        .await
        .unwrap();
    // Second order pays with a distinct payment intent.
    let payload = succeeded_payload("evt_2", &second)
        .replace("pi_integration_1", "pi_integration_2");
    harness.deliver(&payload).await.unwrap();

    let mut paid = harness
        .payouts
        .list_by_order(&second.id)
        .await
        .unwrap()
        .remove(0);
    paid.mark_paid("po_1", Timestamp::now()).unwrap();
    harness.payouts.update(&paid).await.unwrap();

    let reader = InMemoryPayoutReader::new(harness.payouts.clone());

    // Totals: 2 pending (first order), 1 paid (second order).
    let totals = reader.totals_by_status().await.unwrap();
    let count_of = |status: PayoutStatus| {
        totals
            .iter()
            .find(|t| t.status == status)
            .map(|t| t.count)
            .unwrap_or(0)
    };
    assert_eq!(count_of(PayoutStatus::Pending), 2);
    assert_eq!(count_of(PayoutStatus::Paid), 1);

    // Every exported row preserves the sum invariant.
    let rows = reader.export_all().await.unwrap();
    assert_eq!(rows.len(), 3);
    for payout in &rows {
        assert_eq!(payout.commission + payout.net_amount, payout.gross_amount);
    }

    // The CSV ledger matches the fixed column contract.
    let csv = payouts_to_csv(&rows);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], PAYOUT_CSV_HEADER);
    assert_eq!(lines.len(), 4);

    // Top seller by paid volume is seller C.
    let sellers = reader.top_sellers(5).await.unwrap();
    assert_eq!(sellers[0].seller_id.as_str(), "seller-c");
}
