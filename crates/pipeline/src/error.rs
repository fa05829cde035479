use thiserror::Error;

use vouch_store::StoreError;

/// Errors escaping one pipeline run.
///
/// Stage failures never surface here; they are resolved into persisted
/// state. Only validation problems and store trouble reach the queue layer.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad input at the pipeline boundary (missing or deleted company).
    /// Redelivery cannot help; the consumer should drop the message.
    #[error("fatal: {0}")]
    Fatal(String),

    /// The store failed; the job should return to the queue for
    /// at-least-once redelivery.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Whether the queue should redeliver the triggering message.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fatal(_) => false,
            Self::Store(e) => e.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_is_not_retryable() {
        assert!(!PipelineError::Fatal("company missing".into()).is_retryable());
    }

    #[test]
    fn store_backend_error_is_retryable() {
        let err = PipelineError::Store(StoreError::Backend("deadlock".into()));
        assert!(err.is_retryable());
    }
}
