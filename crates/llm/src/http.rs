use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use vouch_limiter::TokenBucket;

use crate::adjuster::{AssessmentRequest, LlmAdjuster, LlmAssessment, MAX_ADJUSTMENT, MIN_ADJUSTMENT};
use crate::config::LlmConfig;
use crate::error::LlmError;

const SYSTEM_PROMPT: &str =
    "You are a risk assessment AI for enterprise verification. Always respond with valid JSON only.";

/// HTTP-based adjuster using an OpenAI-compatible chat completions API.
///
/// Retries any failure with exponential backoff (1s, 2s, 4s) up to the
/// configured attempt count, waiting on the shared rate-limit bucket before
/// each attempt.
#[derive(Debug)]
pub struct HttpLlmAdjuster {
    client: reqwest::Client,
    config: LlmConfig,
    bucket: Arc<TokenBucket>,
}

/// Wire shape of the model's answer; the adjustment may arrive as any JSON
/// number and is clamped after conversion.
#[derive(Debug, Deserialize)]
struct RawAssessment {
    llm_summary: String,
    llm_details: String,
    llm_score_adjustment: serde_json::Number,
}

impl HttpLlmAdjuster {
    /// Create a new HTTP adjuster with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration("API key not configured".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        let bucket = Arc::new(TokenBucket::new(config.rate_limit_per_second, None));
        Ok(Self {
            client,
            config,
            bucket,
        })
    }

    /// Share an existing bucket (e.g. from the process-wide registry).
    #[must_use]
    pub fn with_bucket(mut self, bucket: Arc<TokenBucket>) -> Self {
        self.bucket = bucket;
        self
    }

    /// Render the user prompt from the run's evidence.
    fn build_prompt(request: &AssessmentRequest<'_>) -> String {
        let submitted = request.submitted;
        let mut prompt = format!(
            "Company Submitted Data:\n\
             - Name: {}\n\
             - Domain: {}\n\
             - Email: {}\n\
             - Phone: {}\n\
             - Website URL: {}\n",
            submitted.name,
            submitted.domain,
            submitted.email.as_deref().unwrap_or("N/A"),
            submitted.phone.as_deref().unwrap_or("N/A"),
            submitted.website_url.as_deref().unwrap_or("N/A"),
        );

        let discovered = serde_json::to_string_pretty(request.discovered).unwrap_or_default();
        let _ = write!(prompt, "\nDiscovered Data:\n{discovered}\n\nRule-Based Signals:\n");

        for signal in request.signals {
            let _ = writeln!(
                prompt,
                "- {}: {:?} ({}, weight: {}, severity: {:?})",
                signal.field,
                signal.status,
                signal.value,
                signal.weight,
                signal.severity,
            );
        }

        let _ = write!(
            prompt,
            "\nCurrent Rule Score: {}/100\n\n\
             Task: Provide a risk assessment adjustment based on qualitative analysis \
             of the company's verification data.\n\n\
             Output your response as a JSON object with exactly these fields:\n\
             {{\n\
               \"llm_summary\": \"2-3 sentence executive summary of the risk assessment\",\n\
               \"llm_details\": \"Detailed paragraph explaining your reasoning\",\n\
               \"llm_score_adjustment\": <integer between {MIN_ADJUSTMENT} and {MAX_ADJUSTMENT}>\n\
             }}\n\n\
             Respond with ONLY the JSON object, no additional text.",
            request.rule_score,
        );

        prompt
    }

    /// Parse the model's content into an assessment.
    ///
    /// Strips markdown code fences, then falls back to the first balanced
    /// `{…}` block when the full content is not valid JSON.
    fn parse_response(content: &str) -> Result<LlmAssessment, LlmError> {
        let trimmed = content.trim();

        let json_str = if trimmed.starts_with("```") {
            let without_opening = trimmed
                .strip_prefix("```json")
                .or_else(|| trimmed.strip_prefix("```"))
                .unwrap_or(trimmed);
            without_opening
                .strip_suffix("```")
                .unwrap_or(without_opening)
                .trim()
        } else {
            trimmed
        };

        let raw: RawAssessment = serde_json::from_str(json_str).or_else(|first_err| {
            extract_json_block(json_str)
                .and_then(|block| serde_json::from_str(block).ok())
                .ok_or_else(|| {
                    LlmError::Parse(format!(
                        "invalid JSON from model: {first_err}. Raw content: {content}"
                    ))
                })
        })?;

        #[allow(clippy::cast_possible_truncation)]
        let adjustment = raw
            .llm_score_adjustment
            .as_i64()
            .or_else(|| raw.llm_score_adjustment.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| LlmError::Parse("llm_score_adjustment is not numeric".into()))?
            .clamp(i64::from(MIN_ADJUSTMENT), i64::from(MAX_ADJUSTMENT))
            as i16;

        Ok(LlmAssessment {
            llm_summary: raw.llm_summary,
            llm_details: raw.llm_details,
            llm_score_adjustment: adjustment,
        })
    }

    async fn attempt(&self, prompt: &str) -> Result<LlmAssessment, LlmError> {
        self.bucket.wait().await;

        let request_body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ]
        });

        debug!(endpoint = %self.config.endpoint, model = %self.config.model, "sending LLM assessment request");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_seconds)
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "LLM API returned error");
            return Err(LlmError::Api(format!("HTTP {status}: {body}")));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("failed to parse API response: {e}")))?;

        let content = response_json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                LlmError::Parse(format!("unexpected response format: {response_json}"))
            })?;

        Self::parse_response(content)
    }
}

#[async_trait]
impl LlmAdjuster for HttpLlmAdjuster {
    async fn assess(&self, request: &AssessmentRequest<'_>) -> Result<LlmAssessment, LlmError> {
        let prompt = Self::build_prompt(request);
        let mut last_error = String::new();

        for attempt in 0..self.config.max_retries {
            match self.attempt(&prompt).await {
                Ok(assessment) => {
                    info!(
                        adjustment = assessment.llm_score_adjustment,
                        attempt = attempt + 1,
                        "LLM assessment complete"
                    );
                    return Ok(assessment);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 < self.config.max_retries {
                        let backoff = Duration::from_secs(1 << attempt);
                        warn!(
                            error = %last_error,
                            attempt = attempt + 1,
                            max = self.config.max_retries,
                            backoff_secs = backoff.as_secs(),
                            "LLM attempt failed, backing off"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.config.max_retries,
            last_error,
        })
    }
}

/// Find the first balanced `{…}` block in free-form text.
fn extract_json_block(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in content[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_core::{DiscoveredData, Signal, SubmittedData};

    #[test]
    fn parse_valid_json_response() {
        let content = r#"{"llm_summary": "Low risk.", "llm_details": "All checks pass.", "llm_score_adjustment": -5}"#;
        let assessment = HttpLlmAdjuster::parse_response(content).unwrap();
        assert_eq!(assessment.llm_summary, "Low risk.");
        assert_eq!(assessment.llm_score_adjustment, -5);
    }

    #[test]
    fn parse_json_with_markdown_fences() {
        let content =
            "```json\n{\"llm_summary\": \"s\", \"llm_details\": \"d\", \"llm_score_adjustment\": 10}\n```";
        let assessment = HttpLlmAdjuster::parse_response(content).unwrap();
        assert_eq!(assessment.llm_score_adjustment, 10);
    }

    #[test]
    fn parse_falls_back_to_first_json_block() {
        let content = "Here is my assessment:\n{\"llm_summary\": \"s\", \"llm_details\": \"d\", \"llm_score_adjustment\": 3}\nHope that helps!";
        let assessment = HttpLlmAdjuster::parse_response(content).unwrap();
        assert_eq!(assessment.llm_score_adjustment, 3);
    }

    #[test]
    fn out_of_range_adjustment_is_clamped() {
        let content =
            r#"{"llm_summary": "s", "llm_details": "d", "llm_score_adjustment": 55}"#;
        let assessment = HttpLlmAdjuster::parse_response(content).unwrap();
        assert_eq!(assessment.llm_score_adjustment, 20);

        let content =
            r#"{"llm_summary": "s", "llm_details": "d", "llm_score_adjustment": -100}"#;
        let assessment = HttpLlmAdjuster::parse_response(content).unwrap();
        assert_eq!(assessment.llm_score_adjustment, -20);
    }

    #[test]
    fn fractional_adjustment_is_rounded() {
        let content =
            r#"{"llm_summary": "s", "llm_details": "d", "llm_score_adjustment": 7.6}"#;
        let assessment = HttpLlmAdjuster::parse_response(content).unwrap();
        assert_eq!(assessment.llm_score_adjustment, 8);
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let content = r#"{"llm_summary": "s", "llm_score_adjustment": 0}"#;
        assert!(HttpLlmAdjuster::parse_response(content).is_err());
    }

    #[test]
    fn non_json_content_is_a_parse_error() {
        assert!(HttpLlmAdjuster::parse_response("I cannot help with that.").is_err());
    }

    #[test]
    fn extract_block_handles_nesting() {
        let text = r#"noise {"a": {"b": 1}} trailing"#;
        assert_eq!(extract_json_block(text), Some(r#"{"a": {"b": 1}}"#));
        assert!(extract_json_block("no braces here").is_none());
    }

    #[test]
    fn prompt_includes_evidence() {
        let submitted = SubmittedData {
            name: "NovaGeo".into(),
            domain: "novageo.io".into(),
            website_url: None,
            email: Some("info@novageo.io".into()),
            phone: None,
        };
        let discovered = DiscoveredData::new();
        let signals = vec![Signal::ok("domain_age", "812 days")];
        let request = AssessmentRequest {
            submitted: &submitted,
            discovered: &discovered,
            signals: &signals,
            rule_score: 15,
        };

        let prompt = HttpLlmAdjuster::build_prompt(&request);
        assert!(prompt.contains("NovaGeo"));
        assert!(prompt.contains("domain_age"));
        assert!(prompt.contains("15/100"));
        assert!(prompt.contains("ONLY the JSON object"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = LlmConfig::new("https://api.openai.com/v1/chat/completions", "gpt-4", "");
        assert!(matches!(
            HttpLlmAdjuster::new(config),
            Err(LlmError::Configuration(_))
        ));
    }
}
