pub mod analysis;
pub mod check;
pub mod company;
pub mod context;
pub mod error;
pub mod job;
pub mod signal;
pub mod status;
pub mod types;

pub use analysis::{Analysis, DiscoveredData, NewAnalysis, SubmittedData};
pub use check::{
    Check, DnsData, MxData, PhoneData, ProbeOutcome, WebData, WhoisData, PROBE_STAGES,
};
pub use company::{
    progress_percentage, AnalysisStatus, Company, CompanyEdits, CompanyStatus,
};
pub use context::JobContext;
pub use error::CoreError;
pub use job::{RetryMode, VerificationJob};
pub use signal::{Signal, SignalSeverity, SignalStatus};
pub use status::{auto_approve_eligible, classify_after_analysis, StatusAction};
pub use types::{AnalysisId, CompanyId, CorrelationId};
