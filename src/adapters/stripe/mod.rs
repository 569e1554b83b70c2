//! Stripe adapter - webhook signature verification and wire types.

mod stripe_verifier;
mod webhook_types;

pub use stripe_verifier::{StripeWebhookConfig, StripeWebhookVerifier};
pub use webhook_types::{hex_encode, SignatureHeader, SignatureParseError, StripeWebhookEvent};
