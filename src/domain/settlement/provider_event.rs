//! Payment provider webhook events, in domain form.
//!
//! The wire envelope is `{id, type, data: {object: ...}}`. The verifier
//! adapter hands this over already signature-checked; handlers then extract
//! the typed payload they need. The `object` stays a raw JSON value until a
//! handler claims it, because each event type carries a different object.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::SettlementError;

/// Provider event types this core settles on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEventType {
    /// Payment confirmed; triggers the order transition and payout fan-out.
    PaymentSucceeded,

    /// Payment attempt failed.
    PaymentFailed,

    /// A charge was refunded; triggers reversal of pending payouts.
    ChargeRefunded,

    /// Any event type this core does not settle on.
    Unknown(String),
}

impl ProviderEventType {
    /// Parses the provider's dotted type string.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "payment_intent.succeeded" => ProviderEventType::PaymentSucceeded,
            "payment_intent.payment_failed" => ProviderEventType::PaymentFailed,
            "charge.refunded" => ProviderEventType::ChargeRefunded,
            other => ProviderEventType::Unknown(other.to_string()),
        }
    }
}

/// A verified provider webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    /// Provider event id (`evt_...`), globally unique. The idempotency key.
    pub id: String,

    /// Raw event type string as delivered.
    pub event_type: String,

    /// Unix timestamp when the provider created the event.
    pub created: i64,

    /// The affected object, event-type specific.
    pub object: serde_json::Value,
}

impl ProviderEvent {
    /// Returns the parsed event type.
    pub fn parsed_type(&self) -> ProviderEventType {
        ProviderEventType::from_wire(&self.event_type)
    }

    /// Extracts the payment intent payload.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEvent` when the object is not a payment intent.
    pub fn payment_intent(&self) -> Result<PaymentIntentPayload, SettlementError> {
        serde_json::from_value(self.object.clone()).map_err(|e| {
            SettlementError::MalformedEvent(format!("invalid payment_intent object: {}", e))
        })
    }

    /// Extracts the charge payload.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEvent` when the object is not a charge.
    pub fn charge(&self) -> Result<ChargePayload, SettlementError> {
        serde_json::from_value(self.object.clone())
            .map_err(|e| SettlementError::MalformedEvent(format!("invalid charge object: {}", e)))
    }
}

/// Payment intent object carried on `payment_intent.*` events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentIntentPayload {
    /// Payment intent id (`pi_...`). Stored as the order's payment reference.
    pub id: String,

    /// Amount in minor units.
    #[serde(default)]
    pub amount: i64,

    /// Currency code, lowercase.
    #[serde(default)]
    pub currency: String,

    /// Checkout metadata; carries `order_id`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntentPayload {
    /// Returns the `order_id` from checkout metadata, if present.
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get("order_id").map(String::as_str)
    }
}

/// Charge object carried on `charge.*` events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChargePayload {
    /// Charge id (`ch_...`).
    pub id: String,

    /// Payment intent this charge belongs to.
    #[serde(default)]
    pub payment_intent: Option<String>,

    /// Amount refunded so far, in minor units.
    #[serde(default)]
    pub amount_refunded: i64,

    /// Checkout metadata; carries `order_id` as a fallback lookup key.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ChargePayload {
    /// Returns the `order_id` from checkout metadata, if present.
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get("order_id").map(String::as_str)
    }
}
