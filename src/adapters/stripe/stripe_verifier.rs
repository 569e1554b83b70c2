//! Stripe webhook verifier adapter.
//!
//! Implements the `WebhookVerifier` port for Stripe webhook deliveries.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secret handled via `secrecy::SecretString`; there is no unsigned
//!   fallback, a verifier cannot be constructed without the secret

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::settlement::{ProviderEvent, SettlementError};
use crate::ports::WebhookVerifier;

use super::webhook_types::{hex_encode, SignatureHeader, StripeWebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe webhook configuration.
#[derive(Clone)]
pub struct StripeWebhookConfig {
    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Whether to reject test-mode events.
    require_livemode: bool,
}

impl StripeWebhookConfig {
    /// Create a new webhook configuration.
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: SecretString::new(webhook_secret.into()),
            require_livemode: false,
        }
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe webhook verifier.
///
/// Implements `WebhookVerifier` for the Stripe signature scheme.
pub struct StripeWebhookVerifier {
    config: StripeWebhookConfig,
}

impl StripeWebhookVerifier {
    /// Create a new verifier with the given configuration.
    pub fn new(config: StripeWebhookConfig) -> Self {
        Self { config }
    }

    /// Verify webhook signature using HMAC-SHA256.
    ///
    /// # Security
    ///
    /// - Uses constant-time comparison to prevent timing attacks
    /// - Validates timestamp to prevent replay attacks
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), SettlementError> {
        // 1. Validate timestamp (prevent replay attacks)
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(SettlementError::InvalidSignature(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(SettlementError::InvalidSignature(
                "Event timestamp in future".to_string(),
            ));
        }

        // 2. Compute expected signature over "{timestamp}.{body}"
        let signed_payload = format!(
            "{}.{}",
            header.timestamp,
            String::from_utf8_lossy(payload)
        );

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|e| {
                    SettlementError::InvalidSignature(format!("HMAC key error: {}", e))
                })?;

        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        // 3. Constant-time comparison
        let expected_bytes: &[u8] = expected.as_slice();
        let provided_bytes: &[u8] = &header.v1_signature;

        if expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
            tracing::warn!(
                expected_signature = hex_encode(expected_bytes),
                "Invalid webhook signature"
            );
            return Err(SettlementError::InvalidSignature(
                "Invalid signature".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a Stripe event envelope and convert to the domain event.
    fn parse_event(&self, payload: &[u8]) -> Result<ProviderEvent, SettlementError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            SettlementError::MalformedEvent(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(
                event_id = %stripe_event.id,
                "Rejected test mode event in production"
            );
            return Err(SettlementError::MalformedEvent(
                "Test mode events not allowed in production".to_string(),
            ));
        }

        Ok(ProviderEvent {
            id: stripe_event.id,
            event_type: stripe_event.event_type,
            created: stripe_event.created,
            object: stripe_event.data.object,
        })
    }
}

#[async_trait]
impl WebhookVerifier for StripeWebhookVerifier {
    async fn verify(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ProviderEvent, SettlementError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            SettlementError::InvalidSignature(e.to_string())
        })?;

        // 2. Verify signature (includes timestamp validation)
        self.verify_signature(payload, &header)?;

        // 3. Parse the event envelope
        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook signature verified"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settlement::ProviderEventType;

    fn test_verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(StripeWebhookConfig::new("whsec_test_secret"))
    }

    fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        let result = mac.finalize().into_bytes();

        format!("t={},v1={}", timestamp, hex_encode(&result))
    }

    fn succeeded_payload() -> &'static str {
        r#"{
            "id": "evt_test123",
            "type": "payment_intent.succeeded",
            "created": 1704067200,
            "data": {
                "object": {
                    "id": "pi_1",
                    "amount": 25000,
                    "currency": "usd",
                    "metadata": {"order_id": "8b9f5c0e-8f2a-4d36-b6f0-24f4a52f5d7e"}
                }
            },
            "livemode": false,
            "pending_webhooks": 1
        }"#
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_signature_valid() {
        let verifier = test_verifier();
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign("whsec_test_secret", timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        assert!(verifier.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_wrong_secret() {
        let verifier = test_verifier();
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign("wrong_secret", timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        let result = verifier.verify_signature(payload.as_bytes(), &header);

        assert!(matches!(result, Err(SettlementError::InvalidSignature(_))));
    }

    #[test]
    fn verify_signature_expired_timestamp() {
        let verifier = test_verifier();
        let payload = r#"{"id":"evt_test"}"#;
        let old_timestamp = chrono::Utc::now().timestamp() - 600; // 10 minutes ago
        let signature = sign("whsec_test_secret", old_timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        let result = verifier.verify_signature(payload.as_bytes(), &header);

        assert!(result.unwrap_err().to_string().contains("too old"));
    }

    #[test]
    fn verify_signature_future_timestamp() {
        let verifier = test_verifier();
        let payload = r#"{"id":"evt_test"}"#;
        let future_timestamp = chrono::Utc::now().timestamp() + 120; // 2 minutes ahead
        let signature = sign("whsec_test_secret", future_timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        let result = verifier.verify_signature(payload.as_bytes(), &header);

        assert!(result.unwrap_err().to_string().contains("future"));
    }

    #[test]
    fn verify_signature_small_future_tolerance() {
        let verifier = test_verifier();
        let payload = r#"{"id":"evt_test"}"#;
        // 30 seconds ahead should be tolerated
        let timestamp = chrono::Utc::now().timestamp() + 30;
        let signature = sign("whsec_test_secret", timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        assert!(verifier.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_tampered_payload() {
        let verifier = test_verifier();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign("whsec_test_secret", timestamp, r#"{"amount":100}"#);

        let header = SignatureHeader::parse(&signature).unwrap();
        let result = verifier.verify_signature(br#"{"amount":99900}"#, &header);

        assert!(result.is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Event Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_payment_intent_succeeded() {
        let verifier = test_verifier();

        let event = verifier.parse_event(succeeded_payload().as_bytes()).unwrap();

        assert_eq!(event.id, "evt_test123");
        assert_eq!(event.parsed_type(), ProviderEventType::PaymentSucceeded);
        let intent = event.payment_intent().unwrap();
        assert_eq!(intent.id, "pi_1");
        assert_eq!(
            intent.order_id(),
            Some("8b9f5c0e-8f2a-4d36-b6f0-24f4a52f5d7e")
        );
    }

    #[test]
    fn parse_rejects_test_mode_in_production() {
        let config =
            StripeWebhookConfig::new("whsec_test_secret").with_require_livemode(true);
        let verifier = StripeWebhookVerifier::new(config);

        let result = verifier.parse_event(succeeded_payload().as_bytes());

        assert!(result.unwrap_err().to_string().contains("Test mode"));
    }

    #[test]
    fn parse_unknown_event_type_is_preserved() {
        let verifier = test_verifier();
        let payload = r#"{
            "id": "evt_unknown",
            "type": "customer.created",
            "created": 1704067200,
            "data": {"object": {"id": "cus_1"}},
            "livemode": false
        }"#;

        let event = verifier.parse_event(payload.as_bytes()).unwrap();

        assert_eq!(
            event.parsed_type(),
            ProviderEventType::Unknown("customer.created".to_string())
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Full verify() Flow
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn verify_accepts_signed_payload() {
        let verifier = test_verifier();
        let payload = succeeded_payload();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign("whsec_test_secret", timestamp, payload);

        let event = verifier.verify(payload.as_bytes(), &signature).await.unwrap();

        assert_eq!(event.id, "evt_test123");
    }

    #[tokio::test]
    async fn verify_rejects_malformed_header() {
        let verifier = test_verifier();
        let result = verifier.verify(b"{}", "malformed_header").await;
        assert!(matches!(result, Err(SettlementError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn verify_rejects_invalid_json_body() {
        let verifier = test_verifier();
        let payload = "not valid json";
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign("whsec_test_secret", timestamp, payload);

        let result = verifier.verify(payload.as_bytes(), &signature).await;

        assert!(matches!(result, Err(SettlementError::MalformedEvent(_))));
    }
}
