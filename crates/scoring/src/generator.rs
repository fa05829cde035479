//! Signal generation from declared data and probe outcomes.

use vouch_core::{
    DnsData, MxData, PhoneData, ProbeOutcome, Signal, SignalSeverity, SignalStatus, SubmittedData,
    WebData, WhoisData,
};

use crate::weights::SignalWeights;

/// Probe outcomes available to one scoring pass.
///
/// `None` means the stage never produced data for this company (neither in
/// this run nor in the analysis being reused), which scores the same as a
/// failed check for the mandatory stages.
#[derive(Debug, Clone, Default)]
pub struct ProbeResults {
    pub whois: Option<ProbeOutcome<WhoisData>>,
    pub dns: Option<ProbeOutcome<DnsData>>,
    pub web: Option<ProbeOutcome<WebData>>,
    pub mx: Option<ProbeOutcome<MxData>>,
    pub phone: Option<ProbeOutcome<PhoneData>>,
}

/// Compare declared data against probe outcomes and emit signals.
///
/// Pure and total: the same inputs always produce the same ordered list.
/// `ok` signals are emitted alongside weighted ones so the persisted
/// analysis carries the full audit trail.
#[must_use]
pub fn generate_signals(
    submitted: &SubmittedData,
    results: &ProbeResults,
    weights: &SignalWeights,
) -> Vec<Signal> {
    let mut signals = Vec::new();

    domain_age_signal(&mut signals, results, weights);
    whois_privacy_signal(&mut signals, results, weights);
    dns_signal(&mut signals, results, weights);
    website_signal(&mut signals, results, weights);
    email_signal(&mut signals, submitted, results, weights);
    phone_signal(&mut signals, submitted, results, weights);

    signals
}

fn domain_age_signal(signals: &mut Vec<Signal>, results: &ProbeResults, weights: &SignalWeights) {
    match results.whois.as_ref().and_then(ProbeOutcome::as_success) {
        Some(whois) => match whois.domain_age_days {
            Some(age) if age >= 365 => signals.push(Signal::ok("domain_age", format!("{age} days"))),
            Some(age) => signals.push(Signal::new(
                "domain_age",
                SignalStatus::Suspicious,
                format!("{age} days"),
                weights.domain_age_lt_1_year,
                SignalSeverity::High,
            )),
            None => signals.push(Signal::new(
                "domain_age",
                SignalStatus::Suspicious,
                "Unknown",
                weights.domain_age_lt_1_year,
                SignalSeverity::High,
            )),
        },
        None => signals.push(Signal::new(
            "domain_age",
            SignalStatus::Suspicious,
            "Check failed",
            weights.domain_age_lt_1_year,
            SignalSeverity::High,
        )),
    }
}

fn whois_privacy_signal(
    signals: &mut Vec<Signal>,
    results: &ProbeResults,
    weights: &SignalWeights,
) {
    if let Some(whois) = results.whois.as_ref().and_then(ProbeOutcome::as_success) {
        if whois.privacy_enabled {
            signals.push(Signal::new(
                "whois_privacy",
                SignalStatus::Suspicious,
                "Privacy enabled",
                weights.whois_privacy_enabled,
                SignalSeverity::Medium,
            ));
        } else {
            signals.push(Signal::ok("whois_privacy", "No privacy protection"));
        }
    }
}

fn dns_signal(signals: &mut Vec<Signal>, results: &ProbeResults, weights: &SignalWeights) {
    match results.dns.as_ref().and_then(ProbeOutcome::as_success) {
        Some(dns) if dns.resolves => signals.push(Signal::ok(
            "dns_resolution",
            format!("Resolves to {} IP(s)", dns.a_records.len()),
        )),
        Some(_) => signals.push(Signal::new(
            "dns_resolution",
            SignalStatus::Suspicious,
            "Domain does not resolve",
            weights.dns_not_resolving,
            SignalSeverity::High,
        )),
        None => signals.push(Signal::new(
            "dns_resolution",
            SignalStatus::Suspicious,
            "Check failed",
            weights.dns_not_resolving,
            SignalSeverity::High,
        )),
    }
}

fn website_signal(signals: &mut Vec<Signal>, results: &ProbeResults, weights: &SignalWeights) {
    match results.web.as_ref().and_then(ProbeOutcome::as_success) {
        Some(web) if web.reachable => signals.push(Signal::ok(
            "website_lookup",
            format!("HTTP {}", format_status(web)),
        )),
        Some(web) => signals.push(Signal::new(
            "website_lookup",
            SignalStatus::Suspicious,
            format!("Unreachable (HTTP {})", format_status(web)),
            weights.website_unreachable,
            SignalSeverity::High,
        )),
        None => signals.push(Signal::new(
            "website_lookup",
            SignalStatus::Suspicious,
            "Check failed",
            weights.website_unreachable,
            SignalSeverity::High,
        )),
    }
}

fn format_status(web: &WebData) -> String {
    web.status_code
        .map_or_else(|| "unknown".to_owned(), |code| code.to_string())
}

fn email_signal(
    signals: &mut Vec<Signal>,
    submitted: &SubmittedData,
    results: &ProbeResults,
    weights: &SignalWeights,
) {
    let email = submitted.email.as_deref().unwrap_or_default();
    let mx = results.mx.as_ref().and_then(ProbeOutcome::as_success);

    if let Some((_, email_domain)) = email.rsplit_once('@') {
        if !email_domain.eq_ignore_ascii_case(&submitted.domain) {
            signals.push(Signal::new(
                "email_match",
                SignalStatus::Mismatch,
                format!(
                    "Email domain ({email_domain}) != company domain ({})",
                    submitted.domain
                ),
                weights.email_mismatch,
                SignalSeverity::Medium,
            ));
            return;
        }

        match mx {
            Some(mx) if mx.has_mx_records => signals.push(Signal::ok(
                "email_match",
                format!(
                    "Domain matches, MX records configured ({} records)",
                    mx.mx_records.len()
                ),
            )),
            Some(_) => signals.push(Signal::new(
                "email_match",
                SignalStatus::Suspicious,
                "Domain matches but no MX records",
                weights.no_mx_records,
                SignalSeverity::Medium,
            )),
            None => signals.push(Signal::new(
                "email_match",
                SignalStatus::Suspicious,
                "Domain matches (MX check failed)",
                weights.no_mx_records,
                SignalSeverity::Medium,
            )),
        }
    } else if let Some(mx) = mx
        && !mx.has_mx_records
    {
        // No declared email; the company domain still ought to receive mail.
        signals.push(Signal::new(
            "mx_records",
            SignalStatus::Suspicious,
            "No MX records for domain",
            weights.no_mx_records,
            SignalSeverity::Medium,
        ));
    }
}

fn phone_signal(
    signals: &mut Vec<Signal>,
    submitted: &SubmittedData,
    results: &ProbeResults,
    weights: &SignalWeights,
) {
    if submitted.phone.as_deref().unwrap_or_default().is_empty() {
        return;
    }

    match results.phone.as_ref().and_then(ProbeOutcome::as_success) {
        Some(phone) if phone.valid => signals.push(Signal::ok(
            "phone_validation",
            format!("Valid ({})", phone.region.as_deref().unwrap_or("unknown")),
        )),
        Some(_) => signals.push(Signal::new(
            "phone_validation",
            SignalStatus::Suspicious,
            "Invalid phone number format",
            weights.phone_invalid,
            SignalSeverity::Medium,
        )),
        None => signals.push(Signal::new(
            "phone_validation",
            SignalStatus::Suspicious,
            "Check failed",
            weights.phone_check_failed,
            SignalSeverity::Medium,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted() -> SubmittedData {
        SubmittedData {
            name: "NovaGeo".into(),
            domain: "novageo.io".into(),
            website_url: None,
            email: Some("info@novageo.io".into()),
            phone: Some("+15551234567".into()),
        }
    }

    fn healthy_results() -> ProbeResults {
        ProbeResults {
            whois: Some(ProbeOutcome::Success(WhoisData {
                domain_age_days: Some(812),
                registrar: Some("Example Registrar, Inc.".into()),
                privacy_enabled: false,
                creation_date: None,
            })),
            dns: Some(ProbeOutcome::Success(DnsData {
                resolves: true,
                nameservers: vec!["ns1.novageo.io".into()],
                a_records: vec!["203.0.113.10".into()],
            })),
            web: Some(ProbeOutcome::Success(WebData {
                reachable: true,
                status_code: Some(200),
                title: Some("NovaGeo".into()),
                description: None,
                content_length: 5120,
            })),
            mx: Some(ProbeOutcome::Success(MxData {
                has_mx_records: true,
                mx_records: vec!["10 mx1.novageo.io".into()],
                email_configured: true,
            })),
            phone: Some(ProbeOutcome::Success(PhoneData {
                normalized: Some("+15551234567".into()),
                valid: true,
                region: Some("US".into()),
            })),
        }
    }

    #[test]
    fn happy_path_emits_only_ok_signals() {
        let signals = generate_signals(&submitted(), &healthy_results(), &SignalWeights::default());

        assert_eq!(signals.len(), 6);
        assert!(signals.iter().all(|s| s.status == SignalStatus::Ok));
        assert!(signals.iter().all(|s| s.weight == 0));

        let fields: Vec<&str> = signals.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "domain_age",
                "whois_privacy",
                "dns_resolution",
                "website_lookup",
                "email_match",
                "phone_validation"
            ]
        );
    }

    #[test]
    fn young_private_domain() {
        let mut results = healthy_results();
        results.whois = Some(ProbeOutcome::Success(WhoisData {
            domain_age_days: Some(90),
            registrar: Some("WhoisGuard, Inc.".into()),
            privacy_enabled: true,
            creation_date: None,
        }));

        let signals = generate_signals(&submitted(), &results, &SignalWeights::default());

        let age = signals.iter().find(|s| s.field == "domain_age").unwrap();
        assert_eq!(age.status, SignalStatus::Suspicious);
        assert_eq!(age.weight, 20);
        assert_eq!(age.severity, SignalSeverity::High);
        assert_eq!(age.value, "90 days");

        let privacy = signals.iter().find(|s| s.field == "whois_privacy").unwrap();
        assert_eq!(privacy.status, SignalStatus::Suspicious);
        assert_eq!(privacy.weight, 10);
        assert_eq!(privacy.severity, SignalSeverity::Medium);
    }

    #[test]
    fn unknown_age_is_suspicious() {
        let mut results = healthy_results();
        results.whois = Some(ProbeOutcome::Success(WhoisData::default()));

        let signals = generate_signals(&submitted(), &results, &SignalWeights::default());
        let age = signals.iter().find(|s| s.field == "domain_age").unwrap();
        assert_eq!(age.value, "Unknown");
        assert_eq!(age.weight, 20);
    }

    #[test]
    fn whois_failure_skips_privacy_signal() {
        let mut results = healthy_results();
        results.whois = Some(ProbeOutcome::failed("no WHOIS data returned"));

        let signals = generate_signals(&submitted(), &results, &SignalWeights::default());
        let age = signals.iter().find(|s| s.field == "domain_age").unwrap();
        assert_eq!(age.value, "Check failed");
        assert_eq!(age.weight, 20);
        assert!(!signals.iter().any(|s| s.field == "whois_privacy"));
    }

    #[test]
    fn email_mismatch_short_circuits_mx() {
        let mut data = submitted();
        data.email = Some("ceo@other.com".into());

        let signals = generate_signals(&data, &healthy_results(), &SignalWeights::default());
        let email = signals.iter().find(|s| s.field == "email_match").unwrap();
        assert_eq!(email.status, SignalStatus::Mismatch);
        assert_eq!(email.weight, 10);
        assert!(email.value.contains("other.com"));
        assert!(email.value.contains("novageo.io"));
    }

    #[test]
    fn email_domain_comparison_is_case_insensitive() {
        let mut data = submitted();
        data.email = Some("info@NOVAGEO.IO".into());

        let signals = generate_signals(&data, &healthy_results(), &SignalWeights::default());
        let email = signals.iter().find(|s| s.field == "email_match").unwrap();
        assert_eq!(email.status, SignalStatus::Ok);
    }

    #[test]
    fn matching_domain_without_mx_is_suspicious() {
        let mut results = healthy_results();
        results.mx = Some(ProbeOutcome::Success(MxData::default()));

        let signals = generate_signals(&submitted(), &results, &SignalWeights::default());
        let email = signals.iter().find(|s| s.field == "email_match").unwrap();
        assert_eq!(email.status, SignalStatus::Suspicious);
        assert_eq!(email.weight, 15);
        assert_eq!(email.value, "Domain matches but no MX records");
    }

    #[test]
    fn no_email_and_no_mx_flags_domain() {
        let mut data = submitted();
        data.email = None;
        let mut results = healthy_results();
        results.mx = Some(ProbeOutcome::Success(MxData::default()));

        let signals = generate_signals(&data, &results, &SignalWeights::default());
        let mx = signals.iter().find(|s| s.field == "mx_records").unwrap();
        assert_eq!(mx.status, SignalStatus::Suspicious);
        assert_eq!(mx.weight, 15);
        assert!(!signals.iter().any(|s| s.field == "email_match"));
    }

    #[test]
    fn no_email_with_mx_present_emits_nothing() {
        let mut data = submitted();
        data.email = None;

        let signals = generate_signals(&data, &healthy_results(), &SignalWeights::default());
        assert!(!signals.iter().any(|s| s.field == "mx_records"));
        assert!(!signals.iter().any(|s| s.field == "email_match"));
    }

    #[test]
    fn invalid_phone_weighs_less_than_failed_parse() {
        let mut results = healthy_results();
        results.phone = Some(ProbeOutcome::Success(PhoneData {
            normalized: None,
            valid: false,
            region: None,
        }));
        let signals = generate_signals(&submitted(), &results, &SignalWeights::default());
        let phone = signals
            .iter()
            .find(|s| s.field == "phone_validation")
            .unwrap();
        assert_eq!(phone.weight, 5);

        results.phone = Some(ProbeOutcome::failed("unparseable"));
        let signals = generate_signals(&submitted(), &results, &SignalWeights::default());
        let phone = signals
            .iter()
            .find(|s| s.field == "phone_validation")
            .unwrap();
        assert_eq!(phone.weight, 10);
    }

    #[test]
    fn no_phone_means_no_phone_signal() {
        let mut data = submitted();
        data.phone = None;
        let signals = generate_signals(&data, &healthy_results(), &SignalWeights::default());
        assert!(!signals.iter().any(|s| s.field == "phone_validation"));
    }

    #[test]
    fn all_probes_failed_scores_heavy() {
        let results = ProbeResults {
            whois: Some(ProbeOutcome::failed("timed out")),
            dns: Some(ProbeOutcome::failed("timed out")),
            web: Some(ProbeOutcome::failed("timed out")),
            mx: Some(ProbeOutcome::failed("timed out")),
            phone: Some(ProbeOutcome::failed("timed out")),
        };

        let signals = generate_signals(&submitted(), &results, &SignalWeights::default());
        let total: u32 = signals.iter().map(|s| u32::from(s.weight)).sum();
        // domain_age 20 + dns 15 + website 25 + email(mx failed) 15 + phone 10
        assert_eq!(total, 85);
        assert!(signals.iter().all(|s| s.status != SignalStatus::Ok));
    }
}
