//! WHOIS lookup over TCP port 43 with IANA referral.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use vouch_core::{ProbeOutcome, WhoisData};

/// Registry strings that indicate a WHOIS privacy service.
const PRIVACY_TOKENS: [&str; 4] = ["privacy", "whoisguard", "domainsbyproxy", "namecheap"];

/// The IANA root WHOIS server, used to find the registry for a TLD.
const IANA_WHOIS: &str = "whois.iana.org";

/// WHOIS port.
const WHOIS_PORT: u16 = 43;

/// Upper bound on a single WHOIS response.
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

static CREATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^\s*(?:creation date|created(?: on)?|registered(?: on)?|registration(?: date)?|domain registration date)\s*:\s*(\S[^\r\n]*)",
    )
    .expect("valid regex")
});
static REGISTRAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*registrar\s*:\s*(\S[^\r\n]*)").expect("valid regex"));
static NAMESERVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:name server|nserver)\s*:\s*(\S+)").expect("valid regex")
});
static REFER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(?:refer|whois)\s*:\s*(\S+)").expect("valid regex"));

/// Trait for WHOIS lookups, object-safe so tests can substitute mocks.
#[async_trait]
pub trait WhoisLookup: Send + Sync {
    /// Look up registration data for a domain.
    async fn lookup(&self, domain: &str) -> ProbeOutcome<WhoisData>;
}

/// Production WHOIS client speaking the RFC 3912 protocol.
///
/// Queries `whois.iana.org` for the TLD's registry server, then queries the
/// referred server for the domain record. Holds no cross-call state.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    timeout: Duration,
}

impl WhoisClient {
    /// Create a client with the given overall lookup deadline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn query(server: &str, query: &str) -> std::io::Result<String> {
        let mut stream = TcpStream::connect((server, WHOIS_PORT)).await?;
        stream.write_all(format!("{query}\r\n").as_bytes()).await?;
        stream.shutdown().await?;

        let mut body = String::new();
        stream
            .take(MAX_RESPONSE_BYTES)
            .read_to_string(&mut body)
            .await?;
        Ok(body)
    }

    async fn lookup_inner(domain: &str) -> ProbeOutcome<WhoisData> {
        let referral = match Self::query(IANA_WHOIS, domain).await {
            Ok(body) => body,
            Err(e) => return ProbeOutcome::failed(format!("WHOIS lookup failed: {e}")),
        };

        // Follow the registry referral when IANA provides one; otherwise
        // parse whatever the root server returned.
        let body = match REFER_RE
            .captures(&referral)
            .map(|c| c[1].trim().to_owned())
        {
            Some(server) if server != IANA_WHOIS => {
                debug!(%server, %domain, "following WHOIS referral");
                match Self::query(&server, domain).await {
                    Ok(body) => body,
                    Err(e) => return ProbeOutcome::failed(format!("WHOIS lookup failed: {e}")),
                }
            }
            _ => referral,
        };

        if body.trim().is_empty() {
            return ProbeOutcome::failed("no WHOIS data returned");
        }

        ProbeOutcome::Success(parse_record(&body))
    }
}

#[async_trait]
impl WhoisLookup for WhoisClient {
    async fn lookup(&self, domain: &str) -> ProbeOutcome<WhoisData> {
        match tokio::time::timeout(self.timeout, Self::lookup_inner(domain)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(%domain, "WHOIS lookup timed out");
                ProbeOutcome::failed("WHOIS lookup timed out")
            }
        }
    }
}

/// Parse a raw WHOIS record body into structured data.
fn parse_record(body: &str) -> WhoisData {
    let creation_date = CREATION_RE
        .captures_iter(body)
        .filter_map(|c| parse_date(c[1].trim()))
        .min();

    let domain_age_days =
        creation_date.map(|created| (Utc::now().naive_utc() - created).num_days());

    let registrar = REGISTRAR_RE
        .captures(body)
        .map(|c| c[1].trim().to_owned())
        .filter(|s| !s.is_empty());

    let nameservers: Vec<String> = NAMESERVER_RE
        .captures_iter(body)
        .map(|c| c[1].trim_end_matches('.').to_ascii_lowercase())
        .collect();

    let privacy_enabled = is_privacy_protected(registrar.as_deref(), &nameservers);

    WhoisData {
        domain_age_days,
        registrar,
        privacy_enabled,
        creation_date,
    }
}

/// True when the registrar name or any nameserver carries a privacy token.
fn is_privacy_protected(registrar: Option<&str>, nameservers: &[String]) -> bool {
    let contains_token = |value: &str| {
        let lower = value.to_ascii_lowercase();
        PRIVACY_TOKENS.iter().any(|token| lower.contains(token))
    };

    registrar.is_some_and(contains_token) || nameservers.iter().any(|ns| contains_token(ns))
}

/// Parse the date formats registries actually emit, normalized to naive UTC.
fn parse_date(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d.%m.%Y"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERISIGN_STYLE: &str = "\
   Domain Name: NOVAGEO.IO\n\
   Registrar: Example Registrar, Inc.\n\
   Creation Date: 2019-04-02T09:30:00Z\n\
   Updated Date: 2024-01-15T00:00:00Z\n\
   Name Server: NS1.NOVAGEO.IO.\n\
   Name Server: NS2.NOVAGEO.IO.\n";

    #[test]
    fn parses_registrar_and_creation_date() {
        let data = parse_record(VERISIGN_STYLE);
        assert_eq!(data.registrar.as_deref(), Some("Example Registrar, Inc."));
        assert_eq!(
            data.creation_date.unwrap().date(),
            NaiveDate::from_ymd_opt(2019, 4, 2).unwrap()
        );
        assert!(!data.privacy_enabled);
    }

    #[test]
    fn earliest_creation_date_wins() {
        let body = "\
Creation Date: 2021-06-01T00:00:00Z\n\
Created On: 2018-03-05\n";
        let data = parse_record(body);
        let created = data.creation_date.unwrap();
        assert_eq!(created.date(), NaiveDate::from_ymd_opt(2018, 3, 5).unwrap());
        assert!(data.domain_age_days.unwrap() > 365);
    }

    #[test]
    fn missing_creation_date_leaves_age_unknown() {
        let data = parse_record("Registrar: Example\n");
        assert!(data.creation_date.is_none());
        assert!(data.domain_age_days.is_none());
    }

    #[test]
    fn privacy_detected_in_registrar() {
        let data = parse_record("Registrar: Domains By Proxy, LLC\nCreation Date: 2010-01-01\n");
        assert!(data.privacy_enabled);
    }

    #[test]
    fn privacy_detected_in_nameserver() {
        let data = parse_record("Name Server: ns1.whoisguard.com\n");
        assert!(data.privacy_enabled);
    }

    #[test]
    fn date_format_variants_parse() {
        for value in [
            "2020-05-01T12:00:00Z",
            "2020-05-01T12:00:00.123Z",
            "2020-05-01 12:00:00",
            "2020-05-01",
            "01-May-2020",
            "2020.05.01",
        ] {
            assert!(parse_date(value).is_some(), "failed to parse {value}");
        }
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn referral_line_is_recognized() {
        let body = "refer:        whois.nic.io\nstatus: ACTIVE\n";
        let server = REFER_RE.captures(body).map(|c| c[1].to_owned());
        assert_eq!(server.as_deref(), Some("whois.nic.io"));
    }
}
