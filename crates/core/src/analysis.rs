use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::check::{Check, ProbeOutcome};
use crate::signal::Signal;
use crate::types::{AnalysisId, CompanyId};

/// The declared attributes captured for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmittedData {
    pub name: String,
    pub domain: String,
    pub website_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Raw per-stage probe payloads keyed by data key.
///
/// Each entry is either the stage's structured payload or `{"error": "..."}`.
/// A `BTreeMap` keeps the serialized form deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoveredData(BTreeMap<String, serde_json::Value>);

impl DiscoveredData {
    /// Empty discovered-data map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage outcome, replacing any previous entry for that stage.
    pub fn record<T: Serialize>(&mut self, check: Check, outcome: &ProbeOutcome<T>) {
        if let Some(key) = check.data_key()
            && let Ok(value) = serde_json::to_value(outcome)
        {
            self.0.insert(key.to_owned(), value);
        }
    }

    /// Rehydrate a typed outcome for a stage, if an entry exists.
    #[must_use]
    pub fn outcome<T: DeserializeOwned>(&self, check: Check) -> Option<ProbeOutcome<T>> {
        let key = check.data_key()?;
        let value = self.0.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Whether any entry (payload or error) exists for the stage.
    #[must_use]
    pub fn contains(&self, check: Check) -> bool {
        check.data_key().is_some_and(|key| self.0.contains_key(key))
    }

    /// Whether the stage's entry is an error marker.
    #[must_use]
    pub fn is_error(&self, check: Check) -> bool {
        check
            .data_key()
            .and_then(|key| self.0.get(key))
            .and_then(|value| value.get("error"))
            .is_some()
    }

    /// Raw entry for a data key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Number of recorded stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no stage has recorded anything yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A versioned, immutable snapshot of one completed pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: AnalysisId,
    pub company_id: CompanyId,
    /// Monotonic per-company version, assigned at persistence time.
    pub version: i32,
    pub algorithm_version: String,
    pub submitted_data: SubmittedData,
    pub discovered_data: DiscoveredData,
    /// Signals in generation order.
    pub signals: Vec<Signal>,
    pub risk_score: i16,
    pub llm_summary: Option<String>,
    pub llm_details: Option<String>,
    pub is_complete: bool,
    pub failed_checks: Vec<Check>,
    pub created_at: DateTime<Utc>,
}

/// Payload handed to the store to persist a completed run.
///
/// The store assigns the id, the version, and the creation timestamp.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub company_id: CompanyId,
    pub risk_score: i16,
    pub signals: Vec<Signal>,
    pub failed_checks: Vec<Check>,
    pub submitted_data: SubmittedData,
    pub discovered_data: DiscoveredData,
    pub is_complete: bool,
    pub algorithm_version: String,
    pub llm_summary: Option<String>,
    pub llm_details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{DnsData, WhoisData};

    #[test]
    fn record_and_rehydrate_success() {
        let mut data = DiscoveredData::new();
        data.record(
            Check::Dns,
            &ProbeOutcome::Success(DnsData {
                resolves: true,
                nameservers: vec!["ns1.example.com".into()],
                a_records: vec!["203.0.113.10".into()],
            }),
        );

        assert!(data.contains(Check::Dns));
        assert!(!data.is_error(Check::Dns));

        let outcome: ProbeOutcome<DnsData> = data.outcome(Check::Dns).unwrap();
        let dns = outcome.as_success().unwrap();
        assert!(dns.resolves);
        assert_eq!(dns.a_records, vec!["203.0.113.10"]);
    }

    #[test]
    fn record_failure_marks_error() {
        let mut data = DiscoveredData::new();
        data.record::<WhoisData>(Check::Whois, &ProbeOutcome::failed("lookup timed out"));

        assert!(data.contains(Check::Whois));
        assert!(data.is_error(Check::Whois));

        let outcome: ProbeOutcome<WhoisData> = data.outcome(Check::Whois).unwrap();
        assert_eq!(outcome.error(), Some("lookup timed out"));
    }

    #[test]
    fn replacing_an_entry_overwrites() {
        let mut data = DiscoveredData::new();
        data.record::<DnsData>(Check::Dns, &ProbeOutcome::failed("boom"));
        data.record(Check::Dns, &ProbeOutcome::Success(DnsData::default()));
        assert!(!data.is_error(Check::Dns));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn mx_uses_short_data_key() {
        let mut data = DiscoveredData::new();
        data.record::<crate::check::MxData>(Check::MxValidation, &ProbeOutcome::failed("nope"));
        assert!(data.get("mx").is_some());
        assert!(data.get("mx_validation").is_none());
    }

    #[test]
    fn missing_stage_yields_none() {
        let data = DiscoveredData::new();
        assert!(data.outcome::<DnsData>(Check::Dns).is_none());
        assert!(!data.contains(Check::Dns));
    }
}
