use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Obligation not found: {0}")]
    ObligationNotFound(Uuid),
    #[error("Upstream store unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Upstream store did not answer before the deadline")]
    UpstreamTimeout,
    #[error("Concurrent update on obligation {id}: expected version {expected}, found {found}")]
    ConcurrencyConflict { id: Uuid, expected: u64, found: u64 },
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("Payment of {attempted} exceeds residual {residual} on obligation {id}")]
    Overpayment {
        id: Uuid,
        residual: Decimal,
        attempted: Decimal,
    },
}

impl CoreError {
    /// Whether retrying the same call with fresh data may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::UpstreamUnavailable(_)
                | CoreError::UpstreamTimeout
                | CoreError::ConcurrencyConflict { .. }
        )
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => CoreError::UpstreamUnavailable(message),
            StoreError::Timeout => CoreError::UpstreamTimeout,
            StoreError::NotFound(id) => CoreError::ObligationNotFound(id),
            StoreError::VersionMismatch {
                id,
                expected,
                found,
            } => CoreError::ConcurrencyConflict {
                id,
                expected,
                found,
            },
            StoreError::Write(message) => CoreError::PersistenceFailure(message),
        }
    }
}
