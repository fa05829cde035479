use std::time::Instant;

use crate::types::CorrelationId;

/// Per-job orchestration context.
///
/// Carries the correlation identifier explicitly through the pipeline so
/// that every log and metric emission can include it without ambient
/// thread-local state.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub correlation_id: CorrelationId,
    started_at: Instant,
}

impl JobContext {
    /// Create a context for a job that starts now.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            started_at: Instant::now(),
        }
    }

    /// Create a context with a freshly generated correlation identifier.
    #[must_use]
    pub fn generated() -> Self {
        Self::new(CorrelationId::generate())
    }

    /// Wall-clock time elapsed since the job started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_elapsed_time() {
        let ctx = JobContext::generated();
        assert!(ctx.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn context_keeps_correlation_id() {
        let ctx = JobContext::new(CorrelationId::from("abc-123"));
        assert_eq!(ctx.correlation_id.as_str(), "abc-123");
    }
}
