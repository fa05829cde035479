use serde::{Deserialize, Serialize};

/// Status of a verification signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Ok,
    Suspicious,
    Mismatch,
    Failed,
}

/// Severity level of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSeverity {
    Low,
    Medium,
    High,
}

/// One normalized comparison between declared and discovered data.
///
/// Signals feed the rule engine and are persisted verbatim on the analysis
/// record, so `ok` signals are kept even though they carry no weight: they
/// form the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Field under comparison (e.g. `domain_age`, `email_match`).
    pub field: String,
    pub status: SignalStatus,
    /// Human-readable rendering of the observed value.
    pub value: String,
    /// Contribution to the rule score; always 0 for `ok` signals.
    pub weight: u8,
    pub severity: SignalSeverity,
}

impl Signal {
    /// Create a signal.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        status: SignalStatus,
        value: impl Into<String>,
        weight: u8,
        severity: SignalSeverity,
    ) -> Self {
        Self {
            field: field.into(),
            status,
            value: value.into(),
            weight,
            severity,
        }
    }

    /// Create a weightless `ok` signal.
    #[must_use]
    pub fn ok(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, SignalStatus::Ok, value, 0, SignalSeverity::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_signal_has_zero_weight() {
        let s = Signal::ok("domain_age", "412 days");
        assert_eq!(s.weight, 0);
        assert_eq!(s.status, SignalStatus::Ok);
        assert_eq!(s.severity, SignalSeverity::Low);
    }

    #[test]
    fn signal_serde_roundtrip() {
        let s = Signal::new(
            "website_lookup",
            SignalStatus::Suspicious,
            "Check failed",
            25,
            SignalSeverity::High,
        );
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"suspicious\""));
        assert!(json.contains("\"high\""));
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
