pub mod error;
pub mod metrics;
pub mod orchestrator;

pub use error::PipelineError;
pub use metrics::{MetricsSnapshot, VerificationMetrics};
pub use orchestrator::{Pipeline, PipelineConfig, ProbeSet, RunReport};
