use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vouch_core::{DiscoveredData, Signal, SubmittedData};

use crate::error::LlmError;

/// Bounds on the qualitative score adjustment.
pub const MIN_ADJUSTMENT: i16 = -20;
pub const MAX_ADJUSTMENT: i16 = 20;

/// Everything the adjuster sees about one pipeline run.
#[derive(Debug, Clone)]
pub struct AssessmentRequest<'a> {
    pub submitted: &'a SubmittedData,
    pub discovered: &'a DiscoveredData,
    pub signals: &'a [Signal],
    pub rule_score: i16,
}

/// Qualitative assessment returned by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAssessment {
    /// Short executive summary of the risk picture.
    pub llm_summary: String,
    /// Detailed reasoning paragraph.
    pub llm_details: String,
    /// Bounded adjustment added to the rule score.
    pub llm_score_adjustment: i16,
}

impl LlmAssessment {
    /// Clamp the adjustment into the permitted band.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.llm_score_adjustment = self
            .llm_score_adjustment
            .clamp(MIN_ADJUSTMENT, MAX_ADJUSTMENT);
        self
    }
}

/// Trait for producing a qualitative risk adjustment.
#[async_trait]
pub trait LlmAdjuster: Send + Sync + std::fmt::Debug {
    /// Assess one run and return the bounded adjustment.
    async fn assess(&self, request: &AssessmentRequest<'_>) -> Result<LlmAssessment, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds_adjustment() {
        let high = LlmAssessment {
            llm_summary: String::new(),
            llm_details: String::new(),
            llm_score_adjustment: 45,
        };
        assert_eq!(high.clamped().llm_score_adjustment, 20);

        let low = LlmAssessment {
            llm_summary: String::new(),
            llm_details: String::new(),
            llm_score_adjustment: -99,
        };
        assert_eq!(low.clamped().llm_score_adjustment, -20);
    }

    #[test]
    fn in_band_adjustment_unchanged() {
        let ok = LlmAssessment {
            llm_summary: "s".into(),
            llm_details: "d".into(),
            llm_score_adjustment: -5,
        };
        assert_eq!(ok.clamped().llm_score_adjustment, -5);
    }
}
