//! Payment provider configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment provider configuration (Stripe webhooks + commission).
///
/// The webhook secret is required: with no secret the service refuses to
/// start rather than falling back to parsing unsigned events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,

    /// Platform commission rate in basis points (100 bps = 1%)
    #[serde(default = "default_commission_rate_bps")]
    pub commission_rate_bps: u16,

    /// Reject test-mode events (enable in production)
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "VENDORA__PAYMENT__WEBHOOK_SECRET",
            ));
        }

        // Verify secret prefix for safety
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        if self.commission_rate_bps > 10_000 {
            return Err(ValidationError::InvalidCommissionRate);
        }

        Ok(())
    }
}

fn default_commission_rate_bps() -> u16 {
    crate::domain::settlement::DEFAULT_COMMISSION_RATE_BPS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PaymentConfig {
        PaymentConfig {
            webhook_secret: "whsec_abc123".to_string(),
            commission_rate_bps: 1_000,
            require_livemode: false,
        }
    }

    #[test]
    fn validation_missing_secret_fails_closed() {
        let config = PaymentConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn validation_wrong_secret_prefix() {
        let config = PaymentConfig {
            webhook_secret: "secret_xyz".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidWebhookSecret)
        ));
    }

    #[test]
    fn validation_excessive_rate() {
        let config = PaymentConfig {
            commission_rate_bps: 10_001,
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidCommissionRate)
        ));
    }

    #[test]
    fn validation_valid_config() {
        assert!(valid_config().validate().is_ok());
    }
}
