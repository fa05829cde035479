use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check::Check;
use crate::types::CompanyId;

/// How a job selects the probe stages to execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// Run every probe stage.
    #[default]
    Full,
    /// Re-run only the stages listed in `failed_checks`; everything else is
    /// rehydrated from the most recent analysis.
    FailedOnly,
}

/// A verification job decoded from one queue message body.
///
/// `failed_checks` should be non-empty when `retry_mode` is `failed_only`;
/// when it is empty the orchestrator runs no probes and re-scores the
/// previous results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationJob {
    pub company_id: CompanyId,
    #[serde(default)]
    pub retry_mode: RetryMode,
    #[serde(default)]
    pub failed_checks: Vec<Check>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl VerificationJob {
    /// A full-verification job for a company.
    #[must_use]
    pub fn full(company_id: CompanyId) -> Self {
        Self {
            company_id,
            retry_mode: RetryMode::Full,
            failed_checks: Vec::new(),
            timestamp: Some(Utc::now()),
        }
    }

    /// A selective-retry job for previously failed stages.
    #[must_use]
    pub fn failed_only(company_id: CompanyId, failed_checks: Vec<Check>) -> Self {
        Self {
            company_id,
            retry_mode: RetryMode::FailedOnly,
            failed_checks,
            timestamp: Some(Utc::now()),
        }
    }
}
