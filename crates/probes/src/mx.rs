//! MX record validation for email domains.

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use tracing::{debug, warn};
use vouch_core::{MxData, ProbeOutcome};

/// Trait for MX validation, object-safe so tests can substitute mocks.
#[async_trait]
pub trait MxLookup: Send + Sync {
    /// Look up MX records for an email domain.
    async fn validate(&self, domain: &str) -> ProbeOutcome<MxData>;
}

/// Production MX client backed by the hickory resolver.
pub struct MxClient {
    resolver: TokioResolver,
    timeout: Duration,
}

impl std::fmt::Debug for MxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MxClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl MxClient {
    /// Create a client with the given per-lookup deadline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let resolver = match TokioResolver::builder_tokio() {
            Ok(builder) => builder.build(),
            Err(e) => {
                warn!(error = %e, "system resolver config unavailable, using defaults");
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .build()
            }
        };
        Self { resolver, timeout }
    }

    async fn validate_inner(&self, domain: &str) -> ProbeOutcome<MxData> {
        let entries = match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => lookup
                .iter()
                .map(|mx| {
                    (
                        mx.preference(),
                        mx.exchange().to_utf8().trim_end_matches('.').to_owned(),
                    )
                })
                .collect(),
            Err(e) if e.is_no_records_found() => Vec::new(),
            Err(e) => return ProbeOutcome::failed(format!("MX lookup failed: {e}")),
        };

        let data = mx_data_from_entries(entries);
        debug!(%domain, has_mx = data.has_mx_records, records = data.mx_records.len(), "MX validated");
        ProbeOutcome::Success(data)
    }
}

#[async_trait]
impl MxLookup for MxClient {
    async fn validate(&self, domain: &str) -> ProbeOutcome<MxData> {
        match tokio::time::timeout(self.timeout, self.validate_inner(domain)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(%domain, "MX lookup timed out");
                ProbeOutcome::failed("MX lookup timed out")
            }
        }
    }
}

/// Render `(preference, host)` pairs sorted ascending by preference then host.
fn mx_data_from_entries(mut entries: Vec<(u16, String)>) -> MxData {
    entries.sort();
    let mx_records: Vec<String> = entries
        .into_iter()
        .map(|(pref, host)| format!("{pref} {host}"))
        .collect();
    let has_mx_records = !mx_records.is_empty();

    MxData {
        has_mx_records,
        mx_records,
        email_configured: has_mx_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sorted_by_preference_then_host() {
        let data = mx_data_from_entries(vec![
            (20, "mx2.example.com".into()),
            (10, "mx1.example.com".into()),
            (10, "aspmx.example.com".into()),
        ]);
        assert_eq!(
            data.mx_records,
            vec![
                "10 aspmx.example.com",
                "10 mx1.example.com",
                "20 mx2.example.com"
            ]
        );
        assert!(data.has_mx_records);
        assert!(data.email_configured);
    }

    #[test]
    fn empty_lookup_is_success_without_records() {
        let data = mx_data_from_entries(Vec::new());
        assert!(!data.has_mx_records);
        assert!(!data.email_configured);
        assert!(data.mx_records.is_empty());
    }
}
