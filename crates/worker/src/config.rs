//! Worker configuration loaded from environment variables.

use std::str::FromStr;

use thiserror::Error;

/// Default OpenAI-compatible chat completions endpoint.
const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Errors raised while loading configuration. All are fatal: the worker
/// logs and exits so the orchestration layer restarts it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Process-wide worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Backing store connection URL.
    pub database_url: String,
    /// SQS queue URL delivering verification jobs.
    pub queue_url: String,

    /// Per-stage deadlines in seconds.
    pub whois_timeout: u64,
    pub dns_timeout: u64,
    pub mx_timeout: u64,
    pub http_timeout: u64,
    pub llm_timeout: u64,

    /// LLM attempt budget.
    pub max_retries: u32,

    /// Per-service request rates (requests per second).
    pub whois_rate_limit: f64,
    pub dns_rate_limit: f64,
    pub http_rate_limit: f64,
    pub llm_rate_limit: f64,

    /// API key for the LLM adjuster; absent disables the stage.
    pub llm_api_key: Option<String>,
    pub llm_endpoint: String,
    pub llm_model: String,

    pub algorithm_version: String,
    pub log_level: String,
}

impl WorkerConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));
        let parse = |name: &'static str, default| parse_var(&lookup, name, default);

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            queue_url: required("QUEUE_URL")?,
            whois_timeout: parse("WHOIS_TIMEOUT", 30u64)?,
            dns_timeout: parse("DNS_TIMEOUT", 30u64)?,
            mx_timeout: parse("MX_TIMEOUT", 30u64)?,
            http_timeout: parse("HTTP_TIMEOUT", 30u64)?,
            llm_timeout: parse("LLM_TIMEOUT", 30u64)?,
            max_retries: parse_var(&lookup, "MAX_RETRIES", 3u32)?,
            whois_rate_limit: parse_var(&lookup, "WHOIS_RATE_LIMIT", 1.0f64)?,
            dns_rate_limit: parse_var(&lookup, "DNS_RATE_LIMIT", 5.0f64)?,
            http_rate_limit: parse_var(&lookup, "HTTP_RATE_LIMIT", 10.0f64)?,
            llm_rate_limit: parse_var(&lookup, "LLM_RATE_LIMIT", 3.0f64)?,
            llm_api_key: lookup("LLM_API_KEY").filter(|key| !key.is_empty()),
            llm_endpoint: lookup("LLM_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_owned()),
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| "gpt-4".to_owned()),
            algorithm_version: lookup("ALGORITHM_VERSION").unwrap_or_else(|| "1.0.0".to_owned()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
        })
    }

    /// Whether the LLM stage will run.
    #[must_use]
    pub fn llm_enabled(&self) -> bool {
        self.llm_api_key.is_some()
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/vouch"),
            ("QUEUE_URL", "https://sqs.us-east-1.amazonaws.com/123/verify"),
        ])
    }

    fn config_from(vars: &HashMap<&'static str, &'static str>) -> Result<WorkerConfig, ConfigError> {
        WorkerConfig::from_lookup(|name| vars.get(name).map(|v| (*v).to_owned()))
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = config_from(&base_vars()).unwrap();
        assert_eq!(config.whois_timeout, 30);
        assert_eq!(config.max_retries, 3);
        assert!((config.whois_rate_limit - 1.0).abs() < f64::EPSILON);
        assert!((config.dns_rate_limit - 5.0).abs() < f64::EPSILON);
        assert!((config.http_rate_limit - 10.0).abs() < f64::EPSILON);
        assert!((config.llm_rate_limit - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.llm_model, "gpt-4");
        assert_eq!(config.algorithm_version, "1.0.0");
        assert!(!config.llm_enabled());
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let mut vars = base_vars();
        vars.remove("DATABASE_URL");
        assert!(matches!(
            config_from(&vars),
            Err(ConfigError::MissingVar("DATABASE_URL"))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = base_vars();
        vars.insert("WHOIS_TIMEOUT", "10");
        vars.insert("DNS_RATE_LIMIT", "2.5");
        vars.insert("LLM_API_KEY", "sk-test");
        vars.insert("LLM_MODEL", "gpt-4o");

        let config = config_from(&vars).unwrap();
        assert_eq!(config.whois_timeout, 10);
        assert!((config.dns_rate_limit - 2.5).abs() < f64::EPSILON);
        assert!(config.llm_enabled());
        assert_eq!(config.llm_model, "gpt-4o");
    }

    #[test]
    fn invalid_number_is_rejected() {
        let mut vars = base_vars();
        vars.insert("MAX_RETRIES", "many");
        assert!(matches!(
            config_from(&vars),
            Err(ConfigError::InvalidVar {
                name: "MAX_RETRIES",
                ..
            })
        ));
    }

    #[test]
    fn empty_api_key_disables_llm() {
        let mut vars = base_vars();
        vars.insert("LLM_API_KEY", "");
        assert!(!config_from(&vars).unwrap().llm_enabled());
    }
}
