//! Verification worker: consumes company-verification jobs from SQS, runs
//! the probe pipeline, and persists versioned analyses.

mod config;
mod consumer;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use vouch_limiter::RateLimiterRegistry;
use vouch_llm::{HttpLlmAdjuster, LlmConfig, LlmError};
use vouch_pipeline::{Pipeline, PipelineConfig, ProbeSet, VerificationMetrics};
use vouch_probes::{DnsClient, MxClient, PhoneClient, WebClient, WhoisClient};
use vouch_scoring::SignalWeights;
use vouch_store::{PostgresConfig, PostgresStore, StoreError, VerificationStore};

use crate::config::{ConfigError, WorkerConfig};
use crate::consumer::SqsConsumer;

#[derive(Debug, Error)]
enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), WorkerError> {
    let config = WorkerConfig::from_env()?;
    telemetry::init(&config.log_level);

    info!(
        algorithm_version = %config.algorithm_version,
        llm_enabled = config.llm_enabled(),
        "worker starting"
    );

    let store: Arc<dyn VerificationStore> = Arc::new(
        PostgresStore::new(PostgresConfig::new(config.database_url.as_str())).await?,
    );

    let probes = ProbeSet {
        whois: Arc::new(WhoisClient::new(Duration::from_secs(config.whois_timeout))),
        dns: Arc::new(DnsClient::new(Duration::from_secs(config.dns_timeout))),
        mx: Arc::new(MxClient::new(Duration::from_secs(config.mx_timeout))),
        web: Arc::new(WebClient::new(Duration::from_secs(config.http_timeout))?),
        phone: Arc::new(PhoneClient::new()),
    };

    let limiters = Arc::new(RateLimiterRegistry::new());
    let metrics = Arc::new(VerificationMetrics::new());

    let pipeline_config = PipelineConfig {
        algorithm_version: config.algorithm_version.clone(),
        weights: SignalWeights::default(),
        whois_rate_limit: config.whois_rate_limit,
        dns_rate_limit: config.dns_rate_limit,
        http_rate_limit: config.http_rate_limit,
    };

    let mut pipeline = Pipeline::new(
        Arc::clone(&store),
        probes,
        Arc::clone(&limiters),
        metrics,
        pipeline_config,
    );

    if let Some(api_key) = &config.llm_api_key {
        let llm_config = LlmConfig::new(
            config.llm_endpoint.as_str(),
            config.llm_model.as_str(),
            api_key.as_str(),
        )
            .with_timeout(config.llm_timeout)
            .with_max_retries(config.max_retries)
            .with_rate_limit(config.llm_rate_limit);
        let adjuster = HttpLlmAdjuster::new(llm_config)?
            .with_bucket(limiters.get("llm", config.llm_rate_limit, None));
        pipeline = pipeline.with_llm(Arc::new(adjuster));
        info!(model = %config.llm_model, "LLM adjuster enabled");
    } else {
        warn!("LLM API key not configured, qualitative adjustment disabled");
    }

    let consumer = SqsConsumer::new(config.queue_url.clone(), Arc::new(pipeline), store).await;
    consumer.run().await;

    info!("worker stopped");
    Ok(())
}
