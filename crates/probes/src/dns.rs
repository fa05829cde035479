//! DNS resolution (A + NS records).

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use tracing::{debug, warn};
use vouch_core::{DnsData, ProbeOutcome};

/// Trait for DNS resolution, object-safe so tests can substitute mocks.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Resolve A and NS records for a domain.
    async fn resolve(&self, domain: &str) -> ProbeOutcome<DnsData>;
}

/// Production DNS client backed by the hickory resolver.
///
/// Missing records are data (`resolves = false`, empty lists), not failure;
/// only an unrecoverable resolver error or the stage deadline fails the
/// check.
pub struct DnsClient {
    resolver: TokioResolver,
    timeout: Duration,
}

impl std::fmt::Debug for DnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DnsClient {
    /// Create a client with the given per-lookup deadline.
    ///
    /// Uses the system resolver configuration when readable, falling back
    /// to the library defaults.
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

    async fn resolve_inner(&self, domain: &str) -> ProbeOutcome<DnsData> {
        let a_records = match self.resolver.lookup_ip(domain).await {
            Ok(lookup) => lookup.iter().map(|ip| ip.to_string()).collect(),
            Err(e) if e.is_no_records_found() => Vec::new(),
            Err(e) => return ProbeOutcome::failed(format!("DNS resolution failed: {e}")),
        };

        let nameservers = match self.resolver.ns_lookup(domain).await {
            Ok(lookup) => lookup
                .iter()
                .map(|ns| ns.0.to_utf8().trim_end_matches('.').to_owned())
                .collect(),
            Err(e) if e.is_no_records_found() => Vec::new(),
            Err(e) => return ProbeOutcome::failed(format!("DNS resolution failed: {e}")),
        };

        let data = DnsData {
            resolves: !a_records.is_empty(),
            nameservers,
            a_records,
        };
        debug!(%domain, resolves = data.resolves, a_records = data.a_records.len(), "DNS resolved");
        ProbeOutcome::Success(data)
    }
}

#[async_trait]
impl DnsLookup for DnsClient {
    async fn resolve(&self, domain: &str) -> ProbeOutcome<DnsData> {
        match tokio::time::timeout(self.timeout, self.resolve_inner(domain)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(%domain, "DNS resolution timed out");
                ProbeOutcome::failed("DNS resolution timed out")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_flag_follows_a_records() {
        let with_records = DnsData {
            resolves: true,
            nameservers: vec![],
            a_records: vec!["203.0.113.7".into()],
        };
        assert!(with_records.resolves);

        let without = DnsData::default();
        assert!(!without.resolves);
        assert!(without.a_records.is_empty());
    }

    #[tokio::test]
    async fn client_construction_does_not_panic() {
        let client = DnsClient::new(Duration::from_secs(5));
        assert_eq!(client.timeout, Duration::from_secs(5));
    }
}
