//! Settlement error types.

use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors surfaced by webhook ingress and settlement handlers.
///
/// The HTTP layer maps these onto response codes: signature and parse
/// failures become `400` (the provider will not retry a malformed event
/// into validity), datastore failures become `500` so the provider
/// retries.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Signature header missing, malformed, expired, or wrong.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Event body could not be parsed into the expected shape.
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),

    /// A datastore call failed.
    #[error("Datastore failure: {0}")]
    Database(String),
}

impl From<DomainError> for SettlementError {
    fn from(err: DomainError) -> Self {
        SettlementError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn domain_error_converts_to_database_variant() {
        let err: SettlementError =
            DomainError::new(ErrorCode::DatabaseError, "connection reset").into();
        assert!(matches!(err, SettlementError::Database(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
