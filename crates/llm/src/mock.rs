//! Canned adjusters for orchestrator and integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::adjuster::{AssessmentRequest, LlmAdjuster, LlmAssessment};
use crate::error::LlmError;

/// Adjuster that returns a fixed assessment on every call.
#[derive(Debug)]
pub struct MockLlmAdjuster {
    assessment: LlmAssessment,
    calls: AtomicUsize,
}

impl MockLlmAdjuster {
    /// Create a mock returning the given assessment.
    #[must_use]
    pub fn new(assessment: LlmAssessment) -> Self {
        Self {
            assessment,
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock with the given adjustment and boilerplate text.
    #[must_use]
    pub fn with_adjustment(adjustment: i16) -> Self {
        Self::new(LlmAssessment {
            llm_summary: "Mock summary.".into(),
            llm_details: "Mock details.".into(),
            llm_score_adjustment: adjustment,
        })
    }

    /// Number of assessments performed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmAdjuster for MockLlmAdjuster {
    async fn assess(&self, _request: &AssessmentRequest<'_>) -> Result<LlmAssessment, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.assessment.clone().clamped())
    }
}

/// Adjuster that always fails, for exercising the incomplete-run path.
#[derive(Debug, Default)]
pub struct FailingLlmAdjuster {
    calls: AtomicUsize,
}

impl FailingLlmAdjuster {
    /// Create a failing adjuster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assessments attempted.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmAdjuster for FailingLlmAdjuster {
    async fn assess(&self, _request: &AssessmentRequest<'_>) -> Result<LlmAssessment, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::RetriesExhausted {
            attempts: 3,
            last_error: "mock failure".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_core::{DiscoveredData, SubmittedData};

    fn request<'a>(
        submitted: &'a SubmittedData,
        discovered: &'a DiscoveredData,
    ) -> AssessmentRequest<'a> {
        AssessmentRequest {
            submitted,
            discovered,
            signals: &[],
            rule_score: 0,
        }
    }

    #[tokio::test]
    async fn mock_returns_clamped_assessment() {
        let submitted = SubmittedData::default();
        let discovered = DiscoveredData::new();
        let mock = MockLlmAdjuster::with_adjustment(99);

        let assessment = mock.assess(&request(&submitted, &discovered)).await.unwrap();
        assert_eq!(assessment.llm_score_adjustment, 20);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn failing_mock_errors() {
        let submitted = SubmittedData::default();
        let discovered = DiscoveredData::new();
        let failing = FailingLlmAdjuster::new();

        assert!(failing.assess(&request(&submitted, &discovered)).await.is_err());
        assert_eq!(failing.calls(), 1);
    }
}
