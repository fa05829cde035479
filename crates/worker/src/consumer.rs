//! SQS intake: batch receive, correlation binding, per-record isolation.

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_sqs::types::Message;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};

use vouch_core::{CorrelationId, JobContext, VerificationJob};
use vouch_pipeline::{Pipeline, PipelineError};
use vouch_store::VerificationStore;

/// Message attribute carrying the caller's correlation identifier.
const CORRELATION_ATTRIBUTE: &str = "CorrelationId";

/// Long-poll wait and batch size for receives.
const WAIT_TIME_SECONDS: i32 = 20;
const MAX_MESSAGES: i32 = 10;

/// Pause after a receive error before polling again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
enum RecordError {
    /// The body is not a valid job message. Redelivery cannot fix it.
    #[error("undecodable job message: {0}")]
    Decode(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl RecordError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Decode(_) => false,
            Self::Pipeline(e) => e.is_retryable(),
        }
    }
}

/// Consumes verification jobs from SQS and runs them through the pipeline.
///
/// Records in a batch are processed independently: one failure neither
/// short-circuits the rest nor acknowledges the failed record, so the queue
/// redelivers exactly the records that need it.
pub struct SqsConsumer {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    pipeline: Arc<Pipeline>,
    store: Arc<dyn VerificationStore>,
}

impl SqsConsumer {
    /// Build a consumer using the ambient AWS configuration.
    pub async fn new(
        queue_url: String,
        pipeline: Arc<Pipeline>,
        store: Arc<dyn VerificationStore>,
    ) -> Self {
        let sdk_config = aws_config::from_env().load().await;
        let client = aws_sdk_sqs::Client::new(&sdk_config);
        Self {
            client,
            queue_url,
            pipeline,
            store,
        }
    }

    /// Build a consumer with a pre-built client (for testing).
    pub fn with_client(
        client: aws_sdk_sqs::Client,
        queue_url: String,
        pipeline: Arc<Pipeline>,
        store: Arc<dyn VerificationStore>,
    ) -> Self {
        Self {
            client,
            queue_url,
            pipeline,
            store,
        }
    }

    /// Poll until a shutdown signal arrives.
    pub async fn run(&self) {
        info!(queue_url = %self.queue_url, "worker consuming verification jobs");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, stopping consumer");
                    break;
                }
                result = self.poll_once() => {
                    if let Err(e) = result {
                        error!(error = %e, "receive failed, backing off");
                        tokio::time::sleep(RECEIVE_BACKOFF).await;
                    }
                }
            }
        }
    }

    /// Receive one batch and process each record independently.
    pub async fn poll_once(&self) -> Result<usize, aws_sdk_sqs::Error> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(MAX_MESSAGES)
            .wait_time_seconds(WAIT_TIME_SECONDS)
            .message_attribute_names(CORRELATION_ATTRIBUTE)
            .send()
            .await
            .map_err(aws_sdk_sqs::Error::from)?;

        let messages = response.messages();
        for message in messages {
            let correlation_id = extract_correlation_id(message);
            let span = tracing::info_span!(
                "record",
                correlation_id = %correlation_id,
                message_id = message.message_id().unwrap_or("unknown")
            );

            let outcome = self
                .process_record(message, correlation_id)
                .instrument(span)
                .await;

            match outcome {
                Ok(()) => self.acknowledge(message).await,
                Err(e) if e.is_retryable() => {
                    // Leave the record unacknowledged so the queue redelivers
                    // this record specifically.
                    warn!(error = %e, "record failed, leaving for redelivery");
                }
                Err(e) => {
                    error!(error = %e, "record failed permanently, dropping");
                    self.acknowledge(message).await;
                }
            }
        }

        Ok(messages.len())
    }

    async fn process_record(
        &self,
        message: &Message,
        correlation_id: CorrelationId,
    ) -> Result<(), RecordError> {
        let body = message.body().unwrap_or_default();
        let job: VerificationJob =
            serde_json::from_str(body).map_err(|e| RecordError::Decode(e.to_string()))?;

        info!(company_id = %job.company_id, retry_mode = ?job.retry_mode, "worker started");

        let ctx = JobContext::new(correlation_id);
        match self.pipeline.run(&job, &ctx).await {
            Ok(report) => {
                info!(
                    version = report.analysis.version,
                    final_risk_score = report.final_risk_score,
                    is_complete = report.is_complete,
                    duration_ms = report.duration.as_millis() as u64,
                    "verification finished"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, company_id = %job.company_id, "verification failed");
                // Best effort: close out the run so operators see a
                // classified company instead of one stuck in progress.
                if let Err(mark_err) = self.store.mark_analysis_failed(job.company_id).await {
                    warn!(error = %mark_err, "failed to mark analysis as failed");
                }
                Err(e.into())
            }
        }
    }

    async fn acknowledge(&self, message: &Message) {
        let Some(receipt_handle) = message.receipt_handle() else {
            return;
        };
        if let Err(e) = self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
        {
            warn!(error = %aws_sdk_sqs::Error::from(e), "failed to delete message");
        }
    }
}

/// Read the correlation attribute, generating a fresh id when absent.
fn extract_correlation_id(message: &Message) -> CorrelationId {
    message
        .message_attributes()
        .and_then(|attributes| attributes.get(CORRELATION_ATTRIBUTE))
        .and_then(|attribute| attribute.string_value())
        .filter(|value| !value.is_empty())
        .map_or_else(CorrelationId::generate, CorrelationId::from)
}
