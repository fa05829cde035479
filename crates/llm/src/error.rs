use thiserror::Error;

/// Errors that can occur during LLM assessment.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    /// Failed to parse the LLM response.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// LLM API returned an error response.
    #[error("LLM API error: {0}")]
    Api(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every attempt failed.
    #[error("LLM assessment failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}
