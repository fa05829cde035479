/// Configuration for the HTTP-based LLM adjuster.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible API endpoint (e.g., `https://api.openai.com/v1/chat/completions`).
    pub endpoint: String,
    /// Model to use (e.g., `gpt-4`).
    pub model: String,
    /// API key for authentication.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum attempts before giving up.
    pub max_retries: u32,
    /// Temperature for LLM sampling.
    pub temperature: f64,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Requests per second allowed against the API.
    pub rate_limit_per_second: f64,
}

impl LlmConfig {
    /// Create a new config with the given endpoint, model, and API key.
    ///
    /// Defaults: 30s timeout, 3 attempts, temperature 0.3, 1000 max tokens,
    /// 3 requests/second.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_seconds: 30,
            max_retries: 3,
            temperature: 0.3,
            max_tokens: 1000,
            rate_limit_per_second: 3.0,
        }
    }

    /// Set the request timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the maximum number of attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the temperature for LLM sampling.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens in the response.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request rate limit in requests per second.
    #[must_use]
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.rate_limit_per_second = per_second;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = LlmConfig::new(
            "https://api.openai.com/v1/chat/completions",
            "gpt-4",
            "sk-test",
        );
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.max_retries, 3);
        assert!((config.temperature - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.max_tokens, 1000);
        assert!((config.rate_limit_per_second - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn config_builder() {
        let config = LlmConfig::new("http://localhost:8080/v1/chat/completions", "gpt-4", "sk")
            .with_timeout(10)
            .with_max_retries(5)
            .with_temperature(0.0)
            .with_max_tokens(256)
            .with_rate_limit(1.0);
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.max_retries, 5);
        assert!((config.temperature).abs() < f64::EPSILON);
        assert_eq!(config.max_tokens, 256);
        assert!((config.rate_limit_per_second - 1.0).abs() < f64::EPSILON);
    }
}
