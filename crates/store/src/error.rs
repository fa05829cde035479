use thiserror::Error;

use vouch_core::CompanyId;

/// Errors surfaced by the verification store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced company does not exist.
    #[error("company {0} not found")]
    NotFound(CompanyId),

    /// The operation is not valid in the row's current state.
    ///
    /// Callers must not retry; the condition is stable until an operator or
    /// a new analysis changes the row.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Could not reach or authenticate with the backend.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// Stored data failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether redelivering the triggering job could succeed.
    ///
    /// Validation outcomes are permanent; backend trouble is worth a retry
    /// through the queue's at-least-once delivery.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Backend(_))
    }
}
