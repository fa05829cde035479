use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::SubmittedData;
use crate::types::CompanyId;

/// Operator-visible company status.
///
/// This is the normalized set; legacy spellings from earlier schema
/// revisions are rejected at the serde boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Pending,
    Approved,
    Suspicious,
    Fraudulent,
}

impl CompanyStatus {
    /// Stable string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Suspicious => "suspicious",
            Self::Fraudulent => "fraudulent",
        }
    }
}

impl std::fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanyStatus {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "suspicious" => Ok(Self::Suspicious),
            "fraudulent" => Ok(Self::Fraudulent),
            other => Err(crate::error::CoreError::UnknownStatus(other.to_owned())),
        }
    }
}

/// Progress of the verification pipeline for a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    InProgress,
    Complete,
}

impl AnalysisStatus {
    /// Stable string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            other => Err(crate::error::CoreError::UnknownStatus(other.to_owned())),
        }
    }
}

/// A submitted company and its verification state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub domain: String,
    pub website_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: CompanyStatus,
    /// Latest risk score, always within `0..=100`.
    pub risk_score: i16,
    pub analysis_status: AnalysisStatus,
    /// Last-reached stage tag (`whois`, …, `llm_processing`, or `complete`).
    pub current_step: Option<String>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Create a new pending company with the required declared attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CompanyId::new(),
            name: name.into(),
            domain: domain.into(),
            website_url: None,
            email: None,
            phone: None,
            status: CompanyStatus::Pending,
            risk_score: 0,
            analysis_status: AnalysisStatus::Pending,
            current_step: None,
            last_analyzed_at: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the declared website URL.
    #[must_use]
    pub fn with_website_url(mut self, url: impl Into<String>) -> Self {
        self.website_url = Some(url.into());
        self
    }

    /// Set the declared contact email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the declared phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Snapshot of the declared attributes as used by one pipeline run.
    #[must_use]
    pub fn submitted_data(&self) -> SubmittedData {
        SubmittedData {
            name: self.name.clone(),
            domain: self.domain.clone(),
            website_url: self.website_url.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Partial edit of a company's declared attributes.
///
/// Applied by the store only while the company has never been analyzed;
/// afterwards edits are a precondition failure and callers must request
/// re-analysis instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyEdits {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub website_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Derive the observable progress percentage from pipeline position.
///
/// The percentage is never stored: it is the index of the current step in
/// the fixed stage order over the stage count, clamped to `0..=99` until the
/// run completes. `phone` aliases to the `website_scrape` index and
/// `complete` to `llm_processing`.
#[must_use]
pub fn progress_percentage(analysis_status: AnalysisStatus, current_step: Option<&str>) -> u8 {
    if analysis_status == AnalysisStatus::Complete {
        return 100;
    }

    let step_order = [
        "whois",
        "dns",
        "mx_validation",
        "website_scrape",
        "llm_processing",
    ];
    let normalized = match current_step {
        Some("phone") => "website_scrape",
        Some("complete") => "llm_processing",
        Some(step) => step,
        None => return 0,
    };

    let Some(index) = step_order.iter().position(|s| *s == normalized) else {
        return 0;
    };

    #[allow(clippy::cast_possible_truncation)]
    let progress = (index * 100 / step_order.len()) as u8;
    progress.min(99)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_company_is_pending() {
        let company = Company::new("NovaGeo", "novageo.io");
        assert_eq!(company.status, CompanyStatus::Pending);
        assert_eq!(company.analysis_status, AnalysisStatus::Pending);
        assert_eq!(company.risk_score, 0);
        assert!(company.last_analyzed_at.is_none());
        assert!(!company.is_deleted);
    }

    #[test]
    fn submitted_data_snapshot() {
        let company = Company::new("NovaGeo", "novageo.io")
            .with_email("info@novageo.io")
            .with_phone("+15551234567");
        let data = company.submitted_data();
        assert_eq!(data.domain, "novageo.io");
        assert_eq!(data.email.as_deref(), Some("info@novageo.io"));
        assert!(data.website_url.is_none());
    }

    #[test]
    fn status_serde_is_normalized() {
        assert_eq!(
            serde_json::to_string(&CompanyStatus::Suspicious).unwrap(),
            "\"suspicious\""
        );
        // Legacy spellings from older schema revisions must not parse.
        assert!(serde_json::from_str::<CompanyStatus>("\"rejected\"").is_err());
        assert!(serde_json::from_str::<CompanyStatus>("\"revoked\"").is_err());
        assert!(serde_json::from_str::<AnalysisStatus>("\"completed\"").is_err());
        assert!(serde_json::from_str::<AnalysisStatus>("\"failed\"").is_err());
    }

    #[test]
    fn progress_is_zero_before_first_step() {
        assert_eq!(progress_percentage(AnalysisStatus::Pending, None), 0);
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("whois")),
            0
        );
    }

    #[test]
    fn progress_advances_with_steps() {
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("dns")),
            20
        );
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("mx_validation")),
            40
        );
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("website_scrape")),
            60
        );
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("llm_processing")),
            80
        );
    }

    #[test]
    fn progress_aliases() {
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("phone")),
            60
        );
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("complete")),
            80
        );
    }

    #[test]
    fn progress_never_reaches_100_before_completion() {
        for step in ["whois", "dns", "mx_validation", "website_scrape", "phone", "llm_processing", "complete"] {
            assert!(progress_percentage(AnalysisStatus::InProgress, Some(step)) < 100);
        }
        assert_eq!(progress_percentage(AnalysisStatus::Complete, Some("complete")), 100);
    }

    #[test]
    fn progress_unknown_step_is_zero() {
        assert_eq!(
            progress_percentage(AnalysisStatus::InProgress, Some("mystery")),
            0
        );
    }
}
