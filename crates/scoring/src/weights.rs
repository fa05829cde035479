use serde::{Deserialize, Serialize};

/// Per-condition weights feeding the rule engine.
///
/// These are configuration, not code: deployments may tune them without a
/// release. Defaults match the shipped rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalWeights {
    /// Domain registered less than a year ago, or age unknown.
    #[serde(default = "default_domain_age")]
    pub domain_age_lt_1_year: u8,
    /// Registrar or nameservers indicate a WHOIS privacy service.
    #[serde(default = "default_whois_privacy")]
    pub whois_privacy_enabled: u8,
    /// Domain has no A records or the resolver check failed.
    #[serde(default = "default_dns")]
    pub dns_not_resolving: u8,
    /// Homepage unreachable or the fetch failed.
    #[serde(default = "default_website")]
    pub website_unreachable: u8,
    /// Declared email domain differs from the company domain.
    #[serde(default = "default_email_mismatch")]
    pub email_mismatch: u8,
    /// Matching domain without MX records (or MX check failed).
    #[serde(default = "default_no_mx")]
    pub no_mx_records: u8,
    /// Declared phone parses but is not a valid number.
    #[serde(default = "default_phone_invalid")]
    pub phone_invalid: u8,
    /// Phone parser failed outright.
    #[serde(default = "default_phone_failed")]
    pub phone_check_failed: u8,
}

fn default_domain_age() -> u8 {
    20
}
fn default_whois_privacy() -> u8 {
    10
}
fn default_dns() -> u8 {
    15
}
fn default_website() -> u8 {
    25
}
fn default_email_mismatch() -> u8 {
    10
}
fn default_no_mx() -> u8 {
    15
}
fn default_phone_invalid() -> u8 {
    5
}
fn default_phone_failed() -> u8 {
    10
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            domain_age_lt_1_year: default_domain_age(),
            whois_privacy_enabled: default_whois_privacy(),
            dns_not_resolving: default_dns(),
            website_unreachable: default_website(),
            email_mismatch: default_email_mismatch(),
            no_mx_records: default_no_mx(),
            phone_invalid: default_phone_invalid(),
            phone_check_failed: default_phone_failed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rule_set() {
        let w = SignalWeights::default();
        assert_eq!(w.domain_age_lt_1_year, 20);
        assert_eq!(w.whois_privacy_enabled, 10);
        assert_eq!(w.dns_not_resolving, 15);
        assert_eq!(w.website_unreachable, 25);
        assert_eq!(w.email_mismatch, 10);
        assert_eq!(w.no_mx_records, 15);
        assert_eq!(w.phone_invalid, 5);
        assert_eq!(w.phone_check_failed, 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let w: SignalWeights = serde_json::from_str(r#"{"website_unreachable": 40}"#).unwrap();
        assert_eq!(w.website_unreachable, 40);
        assert_eq!(w.domain_age_lt_1_year, 20);
    }
}
