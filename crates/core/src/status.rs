//! Company status transitions as total functions.
//!
//! Two drivers mutate a company's status: explicit operator actions and the
//! post-analysis auto-classification. Both are expressed here as lookups
//! over `(state, driver)` so no mutation site carries its own conditionals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::company::{AnalysisStatus, CompanyStatus};
use crate::error::CoreError;

/// Operator-issued command tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Approve,
    MarkReviewComplete,
    Reject,
    FlagFraudulent,
    RevokeApproval,
}

impl StatusAction {
    /// Stable string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::MarkReviewComplete => "mark_review_complete",
            Self::Reject => "reject",
            Self::FlagFraudulent => "flag_fraudulent",
            Self::RevokeApproval => "revoke_approval",
        }
    }

    /// All operator actions, for closure tests and docs.
    #[must_use]
    pub fn all() -> [StatusAction; 5] {
        [
            Self::Approve,
            Self::MarkReviewComplete,
            Self::Reject,
            Self::FlagFraudulent,
            Self::RevokeApproval,
        ]
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "mark_review_complete" => Ok(Self::MarkReviewComplete),
            "reject" => Ok(Self::Reject),
            "flag_fraudulent" => Ok(Self::FlagFraudulent),
            "revoke_approval" => Ok(Self::RevokeApproval),
            other => Err(CoreError::UnknownAction(other.to_owned())),
        }
    }
}

impl CompanyStatus {
    /// Apply an operator action, returning the next status.
    ///
    /// Any `(state, action)` pair outside the permitted table is an
    /// [`CoreError::InvalidTransition`] and must not mutate state.
    pub fn apply(self, action: StatusAction) -> Result<CompanyStatus, CoreError> {
        use CompanyStatus::{Approved, Fraudulent, Pending, Suspicious};
        use StatusAction::{Approve, FlagFraudulent, MarkReviewComplete, Reject, RevokeApproval};

        match (self, action) {
            (Pending, Approve | MarkReviewComplete) => Ok(Approved),
            (Pending, Reject) => Ok(Suspicious),
            (Pending | Approved, FlagFraudulent) => Ok(Fraudulent),
            (Approved, RevokeApproval) => Ok(Suspicious),
            (from, action) => Err(CoreError::InvalidTransition { from, action }),
        }
    }
}

/// Post-analysis auto-classification.
///
/// An incomplete run is classified first and never yields `fraudulent` on
/// its own; the score bands apply only to complete runs. Statuses outside
/// the listed combinations are left unchanged.
#[must_use]
pub fn classify_after_analysis(
    current: CompanyStatus,
    risk_score: i16,
    is_complete: bool,
) -> CompanyStatus {
    use CompanyStatus::{Approved, Fraudulent, Pending, Suspicious};

    if !is_complete {
        return if current == Fraudulent {
            Fraudulent
        } else {
            Suspicious
        };
    }

    match (current, risk_score) {
        (_, 70..) => Fraudulent,
        (Pending | Approved, 31..=69) => Suspicious,
        (Pending, ..=30) => Approved,
        (current, _) => current,
    }
}

/// Whether a company qualifies for idempotent auto-approval.
///
/// Used both by the post-analysis classifier and the operator-callable
/// auto-approve operation.
#[must_use]
pub fn auto_approve_eligible(
    status: CompanyStatus,
    analysis_status: AnalysisStatus,
    risk_score: i16,
) -> bool {
    status == CompanyStatus::Pending
        && analysis_status == AnalysisStatus::Complete
        && risk_score <= 30
}

#[cfg(test)]
mod tests {
    use super::*;
    use CompanyStatus::{Approved, Fraudulent, Pending, Suspicious};

    #[test]
    fn permitted_operator_transitions() {
        assert_eq!(Pending.apply(StatusAction::Approve).unwrap(), Approved);
        assert_eq!(
            Pending.apply(StatusAction::MarkReviewComplete).unwrap(),
            Approved
        );
        assert_eq!(Pending.apply(StatusAction::Reject).unwrap(), Suspicious);
        assert_eq!(
            Pending.apply(StatusAction::FlagFraudulent).unwrap(),
            Fraudulent
        );
        assert_eq!(
            Approved.apply(StatusAction::FlagFraudulent).unwrap(),
            Fraudulent
        );
        assert_eq!(
            Approved.apply(StatusAction::RevokeApproval).unwrap(),
            Suspicious
        );
    }

    #[test]
    fn every_other_pair_is_rejected() {
        let permitted = [
            (Pending, StatusAction::Approve),
            (Pending, StatusAction::MarkReviewComplete),
            (Pending, StatusAction::Reject),
            (Pending, StatusAction::FlagFraudulent),
            (Approved, StatusAction::FlagFraudulent),
            (Approved, StatusAction::RevokeApproval),
        ];

        for state in [Pending, Approved, Suspicious, Fraudulent] {
            for action in StatusAction::all() {
                let expected_ok = permitted.contains(&(state, action));
                assert_eq!(
                    state.apply(action).is_ok(),
                    expected_ok,
                    "({state}, {action})"
                );
            }
        }
    }

    #[test]
    fn high_score_on_complete_run_is_fraudulent() {
        assert_eq!(classify_after_analysis(Pending, 70, true), Fraudulent);
        assert_eq!(classify_after_analysis(Approved, 95, true), Fraudulent);
        assert_eq!(classify_after_analysis(Suspicious, 100, true), Fraudulent);
    }

    #[test]
    fn mid_score_marks_pending_or_approved_suspicious() {
        assert_eq!(classify_after_analysis(Pending, 35, true), Suspicious);
        assert_eq!(classify_after_analysis(Approved, 69, true), Suspicious);
        assert_eq!(classify_after_analysis(Pending, 31, true), Suspicious);
    }

    #[test]
    fn low_score_auto_approves_pending_only() {
        assert_eq!(classify_after_analysis(Pending, 0, true), Approved);
        assert_eq!(classify_after_analysis(Pending, 30, true), Approved);
        assert_eq!(classify_after_analysis(Suspicious, 10, true), Suspicious);
        assert_eq!(classify_after_analysis(Approved, 10, true), Approved);
    }

    #[test]
    fn incomplete_run_is_suspicious_never_fraudulent() {
        // Even with a clamped-to-maximum score, an incomplete run alone
        // never produces a fraudulent classification.
        assert_eq!(classify_after_analysis(Pending, 100, false), Suspicious);
        assert_eq!(classify_after_analysis(Approved, 85, false), Suspicious);
        assert_eq!(classify_after_analysis(Suspicious, 0, false), Suspicious);
        assert_eq!(classify_after_analysis(Fraudulent, 0, false), Fraudulent);
    }

    #[test]
    fn auto_approve_eligibility() {
        assert!(auto_approve_eligible(Pending, AnalysisStatus::Complete, 30));
        assert!(auto_approve_eligible(Pending, AnalysisStatus::Complete, 0));
        assert!(!auto_approve_eligible(Pending, AnalysisStatus::Complete, 31));
        assert!(!auto_approve_eligible(
            Pending,
            AnalysisStatus::InProgress,
            10
        ));
        assert!(!auto_approve_eligible(
            Approved,
            AnalysisStatus::Complete,
            10
        ));
    }

    #[test]
    fn action_parse_roundtrip() {
        for action in StatusAction::all() {
            assert_eq!(action.as_str().parse::<StatusAction>().unwrap(), action);
        }
        assert!("promote".parse::<StatusAction>().is_err());
    }
}
