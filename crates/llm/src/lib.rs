pub mod adjuster;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use adjuster::{AssessmentRequest, LlmAdjuster, LlmAssessment};
pub use config::LlmConfig;
pub use error::LlmError;
pub use http::HttpLlmAdjuster;
pub use mock::{FailingLlmAdjuster, MockLlmAdjuster};
