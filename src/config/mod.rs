//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `VENDORA` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use vendora::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment provider configuration (webhook secret, commission rate)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `VENDORA` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `VENDORA__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VENDORA__DATABASE__URL=...` -> `database.url = ...`
    /// - `VENDORA__PAYMENT__WEBHOOK_SECRET=whsec_...` -> `payment.webhook_secret = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required environment variables are missing
    /// or values cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VENDORA")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    /// In particular, a missing or malformed webhook secret fails here:
    /// the service never starts without one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/vendora".to_string(),
                ..Default::default()
            },
            payment: PaymentConfig {
                webhook_secret: "whsec_test".to_string(),
                commission_rate_bps: 1_000,
                require_livemode: false,
            },
        }
    }

    #[test]
    fn complete_config_validates() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn missing_webhook_secret_fails_validation() {
        let mut config = test_config();
        config.payment.webhook_secret = String::new();
        assert!(config.validate().is_err());
    }
}
