//! Integration probes for the verification pipeline.
//!
//! Every client is stateless, runs under a bounded timeout, and converts
//! each failure mode into a tagged [`ProbeOutcome::Failed`](vouch_core::ProbeOutcome)
//! instead of raising. Retry policy belongs to the orchestrator; clients
//! never retry internally.

pub mod dns;
pub mod mock;
pub mod mx;
pub mod phone;
pub mod web;
pub mod whois;

pub use dns::{DnsClient, DnsLookup};
pub use mx::{MxClient, MxLookup};
pub use phone::{PhoneClient, PhoneNormalizer};
pub use web::{HomepageFetcher, WebClient};
pub use whois::{WhoisClient, WhoisLookup};
