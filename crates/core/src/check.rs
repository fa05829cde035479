//! Stage tags and the tagged outcome type returned by integration clients.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One verification stage: a probe or the LLM adjustment.
///
/// The string forms are part of the persisted schema and the job-message
/// contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Whois,
    Dns,
    MxValidation,
    WebsiteScrape,
    Phone,
    LlmProcessing,
}

/// The five probe stages in pipeline execution order.
pub const PROBE_STAGES: [Check; 5] = [
    Check::Whois,
    Check::Dns,
    Check::MxValidation,
    Check::WebsiteScrape,
    Check::Phone,
];

impl Check {
    /// Stable string tag used in job messages and `failed_checks`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whois => "whois",
            Self::Dns => "dns",
            Self::MxValidation => "mx_validation",
            Self::WebsiteScrape => "website_scrape",
            Self::Phone => "phone",
            Self::LlmProcessing => "llm_processing",
        }
    }

    /// Key under which this stage's payload is stored in discovered data.
    ///
    /// `None` for the LLM stage, which stores no probe payload.
    #[must_use]
    pub fn data_key(&self) -> Option<&'static str> {
        match self {
            Self::Whois => Some("whois"),
            Self::Dns => Some("dns"),
            Self::MxValidation => Some("mx"),
            Self::WebsiteScrape => Some("website"),
            Self::Phone => Some("phone"),
            Self::LlmProcessing => None,
        }
    }

    /// The stage that follows this one in the fixed pipeline order.
    #[must_use]
    pub fn next(&self) -> Option<Check> {
        match self {
            Self::Whois => Some(Self::Dns),
            Self::Dns => Some(Self::MxValidation),
            Self::MxValidation => Some(Self::WebsiteScrape),
            Self::WebsiteScrape => Some(Self::Phone),
            Self::Phone => Some(Self::LlmProcessing),
            Self::LlmProcessing => None,
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Check {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whois" => Ok(Self::Whois),
            "dns" => Ok(Self::Dns),
            "mx_validation" => Ok(Self::MxValidation),
            "website_scrape" => Ok(Self::WebsiteScrape),
            "phone" => Ok(Self::Phone),
            "llm_processing" => Ok(Self::LlmProcessing),
            other => Err(CoreError::UnknownCheck(other.to_owned())),
        }
    }
}

/// Outcome of one integration probe.
///
/// Clients never raise across the stage boundary: every failure mode
/// (network, parse, upstream error, timeout) becomes `Failed` with a short
/// message. The serialized form matches the persisted discovered-data
/// schema: a flat payload object on success, `{"error": "..."}` on failure.
/// `Failed` is listed first so the error form wins during untagged
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeOutcome<T> {
    Failed { error: String },
    Success(T),
}

impl<T> ProbeOutcome<T> {
    /// Build a failed outcome from any displayable error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Whether the probe succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success payload, if any.
    #[must_use]
    pub fn as_success(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failed { .. } => None,
        }
    }

    /// The error message, if the probe failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Success(_) => None,
        }
    }
}

/// WHOIS lookup payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoisData {
    /// Whole days since the domain's earliest creation date, if known.
    pub domain_age_days: Option<i64>,
    /// Registrar name as reported by the registry.
    pub registrar: Option<String>,
    /// Whether the record suggests a WHOIS privacy service.
    #[serde(default)]
    pub privacy_enabled: bool,
    /// Earliest creation date found, normalized to naive UTC.
    pub creation_date: Option<NaiveDateTime>,
}

/// DNS resolution payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsData {
    /// True iff at least one A record was returned.
    #[serde(default)]
    pub resolves: bool,
    #[serde(default)]
    pub nameservers: Vec<String>,
    #[serde(default)]
    pub a_records: Vec<String>,
}

/// MX validation payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MxData {
    #[serde(default)]
    pub has_mx_records: bool,
    /// `"{preference} {host}"` entries, ascending by preference then host.
    #[serde(default)]
    pub mx_records: Vec<String>,
    #[serde(default)]
    pub email_configured: bool,
}

/// HTTP homepage fetch payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebData {
    /// True iff the final status code was in `200..400`.
    #[serde(default)]
    pub reachable: bool,
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub content_length: u64,
}

/// Phone normalization payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneData {
    /// E.164 form, present only when the number is valid.
    pub normalized: Option<String>,
    #[serde(default)]
    pub valid: bool,
    /// ISO 3166-1 alpha-2 region detected from the number.
    pub region: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_string_forms_are_stable() {
        assert_eq!(Check::Whois.as_str(), "whois");
        assert_eq!(Check::MxValidation.as_str(), "mx_validation");
        assert_eq!(Check::WebsiteScrape.as_str(), "website_scrape");
        assert_eq!(Check::LlmProcessing.as_str(), "llm_processing");
    }

    #[test]
    fn check_serde_uses_snake_case() {
        let json = serde_json::to_string(&Check::MxValidation).unwrap();
        assert_eq!(json, "\"mx_validation\"");
        let back: Check = serde_json::from_str("\"website_scrape\"").unwrap();
        assert_eq!(back, Check::WebsiteScrape);
    }

    #[test]
    fn unknown_check_is_rejected() {
        assert!("email_scrape".parse::<Check>().is_err());
        assert!(serde_json::from_str::<Check>("\"email_scrape\"").is_err());
    }

    #[test]
    fn probe_stage_order() {
        assert_eq!(Check::Whois.next(), Some(Check::Dns));
        assert_eq!(Check::Phone.next(), Some(Check::LlmProcessing));
        assert_eq!(Check::LlmProcessing.next(), None);
    }

    #[test]
    fn data_keys_match_schema() {
        assert_eq!(Check::MxValidation.data_key(), Some("mx"));
        assert_eq!(Check::WebsiteScrape.data_key(), Some("website"));
        assert_eq!(Check::LlmProcessing.data_key(), None);
    }

    #[test]
    fn outcome_success_serializes_flat() {
        let outcome = ProbeOutcome::Success(DnsData {
            resolves: true,
            nameservers: vec!["ns1.example.com".into()],
            a_records: vec!["93.184.216.34".into()],
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["resolves"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn outcome_failure_roundtrip() {
        let outcome: ProbeOutcome<DnsData> = ProbeOutcome::failed("resolver unavailable");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"error": "resolver unavailable"}));

        let back: ProbeOutcome<DnsData> = serde_json::from_value(json).unwrap();
        assert_eq!(back.error(), Some("resolver unavailable"));
    }

    #[test]
    fn error_form_wins_over_permissive_payload() {
        // WhoisData has all-optional fields; the error object must still
        // deserialize as Failed, not as an empty success payload.
        let json = serde_json::json!({"error": "timed out"});
        let back: ProbeOutcome<WhoisData> = serde_json::from_value(json).unwrap();
        assert!(!back.is_success());
    }
}
