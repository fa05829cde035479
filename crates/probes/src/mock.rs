//! Canned probe implementations for orchestrator and integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use vouch_core::{DnsData, MxData, PhoneData, ProbeOutcome, WebData, WhoisData};

use crate::dns::DnsLookup;
use crate::mx::MxLookup;
use crate::phone::PhoneNormalizer;
use crate::web::HomepageFetcher;
use crate::whois::WhoisLookup;

macro_rules! static_probe {
    ($name:ident, $data:ty, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug)]
        pub struct $name {
            outcome: ProbeOutcome<$data>,
            calls: AtomicUsize,
        }

        impl $name {
            /// Create a mock that returns the given outcome on every call.
            #[must_use]
            pub fn new(outcome: ProbeOutcome<$data>) -> Self {
                Self {
                    outcome,
                    calls: AtomicUsize::new(0),
                }
            }

            /// A mock that always fails with the given message.
            #[must_use]
            pub fn failing(error: &str) -> Self {
                Self::new(ProbeOutcome::failed(error))
            }

            /// Number of times the probe has been invoked.
            #[must_use]
            pub fn calls(&self) -> usize {
                self.calls.load(Ordering::SeqCst)
            }

            fn respond(&self) -> ProbeOutcome<$data> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.outcome.clone()
            }
        }
    };
}

static_probe!(StaticWhois, WhoisData, "WHOIS mock returning a fixed outcome.");
static_probe!(StaticDns, DnsData, "DNS mock returning a fixed outcome.");
static_probe!(StaticMx, MxData, "MX mock returning a fixed outcome.");
static_probe!(StaticWeb, WebData, "Homepage mock returning a fixed outcome.");
static_probe!(StaticPhone, PhoneData, "Phone mock returning a fixed outcome.");

#[async_trait]
impl WhoisLookup for StaticWhois {
    async fn lookup(&self, _domain: &str) -> ProbeOutcome<WhoisData> {
        self.respond()
    }
}

#[async_trait]
impl DnsLookup for StaticDns {
    async fn resolve(&self, _domain: &str) -> ProbeOutcome<DnsData> {
        self.respond()
    }
}

#[async_trait]
impl MxLookup for StaticMx {
    async fn validate(&self, _domain: &str) -> ProbeOutcome<MxData> {
        self.respond()
    }
}

#[async_trait]
impl HomepageFetcher for StaticWeb {
    async fn fetch(&self, _url: &str) -> ProbeOutcome<WebData> {
        self.respond()
    }
}

impl PhoneNormalizer for StaticPhone {
    fn normalize(&self, _phone: &str) -> ProbeOutcome<PhoneData> {
        self.respond()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_counts_invocations() {
        let whois = StaticWhois::new(ProbeOutcome::Success(WhoisData::default()));
        assert_eq!(whois.calls(), 0);
        let _ = whois.lookup("example.com").await;
        let _ = whois.lookup("example.org").await;
        assert_eq!(whois.calls(), 2);
    }

    #[tokio::test]
    async fn failing_mock_returns_error() {
        let dns = StaticDns::failing("resolver exploded");
        let outcome = dns.resolve("example.com").await;
        assert_eq!(outcome.error(), Some("resolver exploded"));
    }
}
