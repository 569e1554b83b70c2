//! ProcessWebhookHandler - Command handler for payment provider webhooks.
//!
//! This is the settlement entry point: verify the delivery, claim the event
//! id in the dedup ledger, dispatch to the per-type settlement logic, and
//! release the claim as processed or failed.
//!
//! ## Exactly-once, twice over
//!
//! The provider delivers at-least-once and out of order, and order + payout
//! writes span multiple records with no enclosing transaction. Two layers
//! keep application exactly-once anyway:
//!
//! 1. The ledger claim stops duplicate deliveries of the same event id from
//!    reaching a handler at all.
//! 2. Every mutation behind the claim is itself idempotent (guarded order
//!    transitions, per-seller payout existence checks), so a re-run after a
//!    partial failure - the ledger records `failed` and the provider
//!    retries - completes the remaining writes without doubling the others.

use std::str::FromStr;
use std::sync::Arc;

use crate::domain::foundation::{OrderId, Timestamp};
use crate::domain::order::{Order, SettleOutcome};
use crate::domain::settlement::{
    plan_payouts, CommissionCalculator, Payout, ProviderEvent, ProviderEventType, SettlementError,
};
use crate::ports::{
    ClaimOutcome, InsertOutcome, OrderRepository, PayoutRepository, ProcessedEventStore,
    WebhookVerifier,
};

/// Cancellation reason stamped on payouts reversed by a refund.
pub const CANCEL_REASON_ORDER_REFUNDED: &str = "order_refunded";

/// Command to process one webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw request body.
    pub payload: Vec<u8>,
    /// Provider signature header.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event was settled by this delivery.
    Processed,

    /// Duplicate delivery; the event id was already claimed or settled.
    Idempotent,

    /// Acknowledged without settlement work (unsupported type, unknown
    /// order, or inapplicable order state).
    Ignored,
}

/// Handler for processing payment provider webhooks.
pub struct ProcessWebhookHandler {
    verifier: Arc<dyn WebhookVerifier>,
    ledger: Arc<dyn ProcessedEventStore>,
    orders: Arc<dyn OrderRepository>,
    payouts: Arc<dyn PayoutRepository>,
    commission: CommissionCalculator,
}

impl ProcessWebhookHandler {
    pub fn new(
        verifier: Arc<dyn WebhookVerifier>,
        ledger: Arc<dyn ProcessedEventStore>,
        orders: Arc<dyn OrderRepository>,
        payouts: Arc<dyn PayoutRepository>,
        commission: CommissionCalculator,
    ) -> Self {
        Self {
            verifier,
            ledger,
            orders,
            payouts,
            commission,
        }
    }

    /// Processes one webhook delivery end to end.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` / `MalformedEvent` before any state is touched.
    /// - `Database` when the ledger claim itself fails (no mutation yet,
    ///   safe for the provider to retry).
    /// - Any error after a successful claim leaves the ledger record in
    ///   `failed`; the provider retry re-runs the handler safely.
    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<WebhookOutcome, SettlementError> {
        // 1. Verify signature and parse the envelope. No mutation on failure.
        let event = self.verifier.verify(&cmd.payload, &cmd.signature).await?;

        // 2. Unsupported event types are acknowledged without touching the
        //    ledger, so the provider does not build a retry storm.
        let event_type = event.parsed_type();
        if let ProviderEventType::Unknown(ref name) = event_type {
            tracing::info!(event_id = %event.id, event_type = %name, "Ignoring unsupported event type");
            return Ok(WebhookOutcome::Ignored);
        }

        // 3. Claim the event id. The unique insert is the only cross-handler
        //    lock; losing it means another delivery owns (or finished) this
        //    event.
        match self.ledger.claim(&event.id, &event.event_type).await? {
            ClaimOutcome::Claimed => {}
            ClaimOutcome::AlreadyClaimed => {
                tracing::info!(event_id = %event.id, "Duplicate delivery, already claimed");
                return Ok(WebhookOutcome::Idempotent);
            }
        }

        // 4. Run the settlement logic, then release the claim.
        let result = self.dispatch(&event, event_type).await;

        match result {
            Ok(outcome) => {
                self.ledger.mark_processed(&event.id).await?;
                Ok(outcome)
            }
            Err(err) => {
                // Best effort: a failed release leaves a stale `processing`
                // record, which the claim lease makes reclaimable later.
                if let Err(mark_err) = self.ledger.mark_failed(&event.id, &err.to_string()).await {
                    tracing::error!(
                        event_id = %event.id,
                        error = %mark_err,
                        "Failed to record handler failure in event ledger"
                    );
                }
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        event: &ProviderEvent,
        event_type: ProviderEventType,
    ) -> Result<WebhookOutcome, SettlementError> {
        match event_type {
            ProviderEventType::PaymentSucceeded => self.handle_payment_succeeded(event).await,
            ProviderEventType::PaymentFailed => self.handle_payment_failed(event).await,
            ProviderEventType::ChargeRefunded => self.handle_charge_refunded(event).await,
            ProviderEventType::Unknown(_) => Ok(WebhookOutcome::Ignored),
        }
    }

    /// Finds the order referenced by `order_id` metadata, if any.
    async fn find_order_by_metadata(
        &self,
        event_id: &str,
        order_id: Option<&str>,
    ) -> Result<Option<Order>, SettlementError> {
        let Some(raw) = order_id else {
            tracing::warn!(event_id = %event_id, "Event carries no order_id metadata, skipping");
            return Ok(None);
        };

        let Ok(order_id) = OrderId::from_str(raw) else {
            tracing::warn!(event_id = %event_id, order_id = %raw, "Malformed order_id metadata, skipping");
            return Ok(None);
        };

        let order = self.orders.find_by_id(&order_id).await?;
        if order.is_none() {
            tracing::warn!(event_id = %event_id, order_id = %order_id, "Order not found, skipping");
        }
        Ok(order)
    }

    async fn handle_payment_succeeded(
        &self,
        event: &ProviderEvent,
    ) -> Result<WebhookOutcome, SettlementError> {
        let intent = event.payment_intent()?;

        let Some(mut order) = self
            .find_order_by_metadata(&event.id, intent.order_id())
            .await?
        else {
            return Ok(WebhookOutcome::Ignored);
        };

        if intent.amount != order.total_price.minor() {
            tracing::warn!(
                event_id = %event.id,
                order_id = %order.id,
                intent_amount = intent.amount,
                order_total = order.total_price.minor(),
                "Payment amount does not match order total"
            );
        }

        let now = Timestamp::now();
        let previous = order.status;
        match order.mark_paid(&intent.id, now) {
            Ok(SettleOutcome::Applied) => {
                if self.orders.update_if_status(&order, previous).await? {
                    tracing::info!(
                        event_id = %event.id,
                        order_id = %order.id,
                        "Order marked paid"
                    );
                } else {
                    tracing::info!(
                        event_id = %event.id,
                        order_id = %order.id,
                        "Order transitioned concurrently, keeping stored state"
                    );
                }
            }
            Ok(SettleOutcome::AlreadyApplied) => {
                // Duplicate signal or a re-run after partial failure. The
                // fan-out below still runs; existence checks keep it safe.
                tracing::debug!(
                    event_id = %event.id,
                    order_id = %order.id,
                    "Payment already applied to order"
                );
            }
            Err(err) => {
                tracing::warn!(
                    event_id = %event.id,
                    order_id = %order.id,
                    status = ?order.status,
                    error = %err,
                    "Order cannot accept payment, skipping"
                );
                return Ok(WebhookOutcome::Ignored);
            }
        }

        self.fan_out_payouts(&event.id, &order, now).await?;
        Ok(WebhookOutcome::Processed)
    }

    /// Creates one pending payout per seller of the order.
    ///
    /// Re-entrant: a payout that already exists for `(order, seller)` is
    /// skipped, and an insert conflict skips that seller only.
    async fn fan_out_payouts(
        &self,
        event_id: &str,
        order: &Order,
        now: Timestamp,
    ) -> Result<(), SettlementError> {
        for draft in plan_payouts(&order.items, &self.commission) {
            if self
                .payouts
                .find_by_order_and_seller(&order.id, &draft.seller_id)
                .await?
                .is_some()
            {
                tracing::debug!(
                    event_id = %event_id,
                    order_id = %order.id,
                    seller_id = %draft.seller_id,
                    "Payout already exists, skipping seller"
                );
                continue;
            }

            let payout = Payout::create(
                order.id,
                draft.seller_id.clone(),
                draft.gross,
                draft.split,
                order.currency.clone(),
                now,
            );

            match self.payouts.insert(&payout).await? {
                InsertOutcome::Inserted => {
                    tracing::info!(
                        event_id = %event_id,
                        order_id = %order.id,
                        seller_id = %draft.seller_id,
                        gross = %draft.gross,
                        net = %draft.split.net,
                        "Payout created"
                    );
                }
                InsertOutcome::AlreadyExists => {
                    tracing::debug!(
                        event_id = %event_id,
                        order_id = %order.id,
                        seller_id = %draft.seller_id,
                        "Payout insert raced, skipping seller"
                    );
                }
            }
        }
        Ok(())
    }

    async fn handle_payment_failed(
        &self,
        event: &ProviderEvent,
    ) -> Result<WebhookOutcome, SettlementError> {
        let intent = event.payment_intent()?;

        let Some(mut order) = self
            .find_order_by_metadata(&event.id, intent.order_id())
            .await?
        else {
            return Ok(WebhookOutcome::Ignored);
        };

        let previous = order.status;
        match order.mark_payment_failed(Timestamp::now()) {
            Ok(SettleOutcome::Applied) => {
                self.orders.update_if_status(&order, previous).await?;
                tracing::info!(
                    event_id = %event.id,
                    order_id = %order.id,
                    "Order marked payment_failed"
                );
                Ok(WebhookOutcome::Processed)
            }
            Ok(SettleOutcome::AlreadyApplied) => {
                tracing::debug!(
                    event_id = %event.id,
                    order_id = %order.id,
                    "Payment failure already applied"
                );
                Ok(WebhookOutcome::Processed)
            }
            Err(err) => {
                tracing::warn!(
                    event_id = %event.id,
                    order_id = %order.id,
                    status = ?order.status,
                    error = %err,
                    "Order cannot record payment failure, skipping"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn handle_charge_refunded(
        &self,
        event: &ProviderEvent,
    ) -> Result<WebhookOutcome, SettlementError> {
        let charge = event.charge()?;

        // Lookup order: stored payment reference first, event metadata as
        // the fallback for charges created before the reference was stored.
        let mut order = match charge.payment_intent.as_deref() {
            Some(payment_intent) => self.orders.find_by_payment_intent(payment_intent).await?,
            None => None,
        };
        if order.is_none() {
            order = self
                .find_order_by_metadata(&event.id, charge.order_id())
                .await?;
        }
        let Some(mut order) = order else {
            // A refund arriving before the succeeded event created the
            // order's payment reference cannot be settled usefully;
            // acknowledge and let reconciliation catch it.
            tracing::warn!(event_id = %event.id, charge_id = %charge.id, "Refund for unknown order, skipping");
            return Ok(WebhookOutcome::Ignored);
        };

        let previous = order.status;
        match order.mark_refunded(Timestamp::now()) {
            Ok(SettleOutcome::Applied) => {
                self.orders.update_if_status(&order, previous).await?;
                tracing::info!(
                    event_id = %event.id,
                    order_id = %order.id,
                    "Order marked refunded"
                );
            }
            Ok(SettleOutcome::AlreadyApplied) => {
                // Re-run after a partial failure: the payout sweep below
                // still needs to happen.
                tracing::debug!(
                    event_id = %event.id,
                    order_id = %order.id,
                    "Refund already applied to order"
                );
            }
            Err(err) => {
                tracing::warn!(
                    event_id = %event.id,
                    order_id = %order.id,
                    status = ?order.status,
                    error = %err,
                    "Order cannot be refunded, skipping"
                );
                return Ok(WebhookOutcome::Ignored);
            }
        }

        let cancelled = self
            .payouts
            .cancel_pending_for_order(&order.id, CANCEL_REASON_ORDER_REFUNDED)
            .await?;
        tracing::info!(
            event_id = %event.id,
            order_id = %order.id,
            cancelled_payouts = cancelled,
            "Pending payouts cancelled for refunded order"
        );

        Ok(WebhookOutcome::Processed)
    }
}
