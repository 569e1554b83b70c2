//! WebhookVerifier port - signature verification for provider webhooks.

use async_trait::async_trait;

use crate::domain::settlement::{ProviderEvent, SettlementError};

/// Port for verifying and parsing provider webhook deliveries.
///
/// Verification happens before any state is touched: a delivery that fails
/// the signature check performs no mutation at all. There is no unsigned
/// path; constructing a verifier requires the shared secret.
#[async_trait]
pub trait WebhookVerifier: Send + Sync {
    /// Verifies the signature over the raw body and parses the envelope.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` on header or signature problems and
    /// `MalformedEvent` when the body is not a valid event envelope.
    async fn verify(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ProviderEvent, SettlementError>;
}
