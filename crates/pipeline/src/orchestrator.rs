//! Drives one verification job end-to-end.
//!
//! Stages run strictly in the fixed order `whois -> dns -> mx_validation ->
//! website_scrape -> phone -> llm_processing`. Stage failures are captured
//! into discovered data and `failed_checks`, never raised; only store
//! failures abort the run and return the job to the queue.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use vouch_core::{
    AnalysisStatus, Check, DiscoveredData, JobContext, NewAnalysis, ProbeOutcome, RetryMode,
    VerificationJob, PROBE_STAGES,
};
use vouch_limiter::RateLimiterRegistry;
use vouch_llm::{AssessmentRequest, LlmAdjuster};
use vouch_probes::{DnsLookup, HomepageFetcher, MxLookup, PhoneNormalizer, WhoisLookup};
use vouch_scoring::{generate_signals, hybrid_score, rule_score, ProbeResults, SignalWeights};
use vouch_store::VerificationStore;

use crate::error::PipelineError;
use crate::metrics::VerificationMetrics;

/// The integration clients one pipeline dispatches to.
#[derive(Clone)]
pub struct ProbeSet {
    pub whois: Arc<dyn WhoisLookup>,
    pub dns: Arc<dyn DnsLookup>,
    pub mx: Arc<dyn MxLookup>,
    pub web: Arc<dyn HomepageFetcher>,
    pub phone: Arc<dyn PhoneNormalizer>,
}

/// Pipeline-level configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub algorithm_version: String,
    pub weights: SignalWeights,
    /// WHOIS requests per second.
    pub whois_rate_limit: f64,
    /// DNS queries per second (shared with MX lookups).
    pub dns_rate_limit: f64,
    /// Homepage fetches per second.
    pub http_rate_limit: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            algorithm_version: "1.0.0".to_owned(),
            weights: SignalWeights::default(),
            whois_rate_limit: 1.0,
            dns_rate_limit: 5.0,
            http_rate_limit: 10.0,
        }
    }
}

/// Summary of one completed orchestration, for logging and consumer replies.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub analysis: vouch_core::Analysis,
    pub rule_score: i16,
    pub llm_adjustment: i16,
    pub final_risk_score: i16,
    pub is_complete: bool,
    pub successful_checks: Vec<Check>,
    pub failed_checks: Vec<Check>,
    pub duration: Duration,
}

/// One orchestration per job message; shared handles are explicit.
pub struct Pipeline {
    store: Arc<dyn VerificationStore>,
    probes: ProbeSet,
    llm: Option<Arc<dyn LlmAdjuster>>,
    limiters: Arc<RateLimiterRegistry>,
    metrics: Arc<VerificationMetrics>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Assemble a pipeline over the given shared handles.
    #[must_use]
    pub fn new(
        store: Arc<dyn VerificationStore>,
        probes: ProbeSet,
        limiters: Arc<RateLimiterRegistry>,
        metrics: Arc<VerificationMetrics>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            probes,
            llm: None,
            limiters,
            metrics,
            config,
        }
    }

    /// Enable the LLM adjustment stage. Without it the pipeline scores on
    /// rules alone and `llm_processing` is never attempted.
    #[must_use]
    pub fn with_llm(mut self, adjuster: Arc<dyn LlmAdjuster>) -> Self {
        self.llm = Some(adjuster);
        self
    }

    /// Shared metrics handle.
    #[must_use]
    pub fn metrics(&self) -> Arc<VerificationMetrics> {
        Arc::clone(&self.metrics)
    }

    async fn throttle(&self, service: &str, rate: f64) {
        self.limiters.get(service, rate, None).wait().await;
    }

    fn record_outcome<T: Serialize>(
        &self,
        check: Check,
        outcome: &ProbeOutcome<T>,
        discovered: &mut DiscoveredData,
        successful: &mut BTreeSet<Check>,
        failed: &mut BTreeSet<Check>,
    ) {
        discovered.record(check, outcome);
        if outcome.is_success() {
            successful.insert(check);
            self.metrics.record_integration_success(check.as_str());
        } else {
            failed.insert(check);
            self.metrics
                .record_integration_failure(check.as_str(), "check_failed");
        }
    }

    /// Run one job to completion and persist the result.
    #[instrument(
        skip_all,
        fields(correlation_id = %ctx.correlation_id, company_id = %job.company_id)
    )]
    pub async fn run(
        &self,
        job: &VerificationJob,
        ctx: &JobContext,
    ) -> Result<RunReport, PipelineError> {
        let Some(company) = self.store.fetch_company(job.company_id).await? else {
            self.metrics.record_analysis_failure("company_not_found");
            return Err(PipelineError::Fatal(format!(
                "company {} not found",
                job.company_id
            )));
        };
        if company.is_deleted {
            self.metrics.record_analysis_failure("company_deleted");
            return Err(PipelineError::Fatal(format!(
                "company {} is deleted",
                company.id
            )));
        }

        info!(retry_mode = ?job.retry_mode, domain = %company.domain, "processing company");

        self.store
            .update_company_step(company.id, Check::Whois, Some(AnalysisStatus::InProgress))
            .await?;

        let submitted = company.submitted_data();

        // Seed from the most recent analysis for selective retries.
        let mut previous_failed: BTreeSet<Check> = BTreeSet::new();
        let mut discovered = DiscoveredData::new();
        if job.retry_mode == RetryMode::FailedOnly
            && let Some(previous) = self.store.fetch_latest_analysis(company.id).await?
        {
            previous_failed = previous.failed_checks.iter().copied().collect();
            discovered = previous.discovered_data.clone();
        }

        let mut successful: BTreeSet<Check> = BTreeSet::new();
        let mut failed: BTreeSet<Check> = BTreeSet::new();
        for stage in PROBE_STAGES {
            if previous_failed.contains(&stage) {
                failed.insert(stage);
            } else if discovered.contains(stage) {
                successful.insert(stage);
            }
        }

        let retry_set: BTreeSet<Check> = job.failed_checks.iter().copied().collect();
        let checks_to_run: BTreeSet<Check> = match job.retry_mode {
            RetryMode::Full => PROBE_STAGES.into_iter().collect(),
            RetryMode::FailedOnly if retry_set.is_empty() => {
                info!("selective retry with no failed checks; reusing previous results");
                BTreeSet::new()
            }
            RetryMode::FailedOnly => PROBE_STAGES
                .into_iter()
                .filter(|stage| retry_set.contains(stage))
                .collect(),
        };

        // WHOIS
        let whois_outcome = if checks_to_run.contains(&Check::Whois) {
            successful.remove(&Check::Whois);
            failed.remove(&Check::Whois);
            self.throttle("whois", self.config.whois_rate_limit).await;
            info!(domain = %company.domain, "executing WHOIS lookup");
            let outcome = self.probes.whois.lookup(&company.domain).await;
            self.record_outcome(
                Check::Whois,
                &outcome,
                &mut discovered,
                &mut successful,
                &mut failed,
            );
            Some(outcome)
        } else {
            discovered.outcome(Check::Whois)
        };
        self.store
            .update_company_step(company.id, Check::Dns, None)
            .await?;

        // DNS
        let dns_outcome = if checks_to_run.contains(&Check::Dns) {
            successful.remove(&Check::Dns);
            failed.remove(&Check::Dns);
            self.throttle("dns", self.config.dns_rate_limit).await;
            info!(domain = %company.domain, "executing DNS resolution");
            let outcome = self.probes.dns.resolve(&company.domain).await;
            self.record_outcome(
                Check::Dns,
                &outcome,
                &mut discovered,
                &mut successful,
                &mut failed,
            );
            Some(outcome)
        } else {
            discovered.outcome(Check::Dns)
        };
        self.store
            .update_company_step(company.id, Check::MxValidation, None)
            .await?;

        // MX validation runs against the declared email's domain when one
        // exists, else the company domain.
        let mx_outcome = if checks_to_run.contains(&Check::MxValidation) {
            successful.remove(&Check::MxValidation);
            failed.remove(&Check::MxValidation);
            self.throttle("dns", self.config.dns_rate_limit).await;
            let mx_domain = company
                .email
                .as_deref()
                .and_then(|email| email.rsplit_once('@'))
                .map_or(company.domain.as_str(), |(_, domain)| domain);
            info!(domain = %mx_domain, "executing MX validation");
            let outcome = self.probes.mx.validate(mx_domain).await;
            self.record_outcome(
                Check::MxValidation,
                &outcome,
                &mut discovered,
                &mut successful,
                &mut failed,
            );
            Some(outcome)
        } else {
            discovered.outcome(Check::MxValidation)
        };
        self.store
            .update_company_step(company.id, Check::WebsiteScrape, None)
            .await?;

        // Homepage
        let web_outcome = if checks_to_run.contains(&Check::WebsiteScrape) {
            successful.remove(&Check::WebsiteScrape);
            failed.remove(&Check::WebsiteScrape);
            self.throttle("http", self.config.http_rate_limit).await;
            let url = company
                .website_url
                .clone()
                .unwrap_or_else(|| format!("https://{}", company.domain));
            info!(%url, "executing website scrape");
            let outcome = self.probes.web.fetch(&url).await;
            self.record_outcome(
                Check::WebsiteScrape,
                &outcome,
                &mut discovered,
                &mut successful,
                &mut failed,
            );
            Some(outcome)
        } else {
            discovered.outcome(Check::WebsiteScrape)
        };
        self.store
            .update_company_step(company.id, Check::Phone, None)
            .await?;

        // Phone runs only when a number was declared.
        let has_phone = company
            .phone
            .as_deref()
            .is_some_and(|phone| !phone.trim().is_empty());
        let phone_outcome = if checks_to_run.contains(&Check::Phone) && has_phone {
            successful.remove(&Check::Phone);
            failed.remove(&Check::Phone);
            let phone = company.phone.as_deref().unwrap_or_default();
            info!("executing phone normalization");
            let outcome = self.probes.phone.normalize(phone);
            self.record_outcome(
                Check::Phone,
                &outcome,
                &mut discovered,
                &mut successful,
                &mut failed,
            );
            Some(outcome)
        } else {
            discovered.outcome(Check::Phone)
        };
        self.store
            .update_company_step(company.id, Check::LlmProcessing, None)
            .await?;

        // Signals and rule score.
        let results = ProbeResults {
            whois: whois_outcome,
            dns: dns_outcome,
            web: web_outcome,
            mx: mx_outcome,
            phone: phone_outcome,
        };
        let signals = generate_signals(&submitted, &results, &self.config.weights);
        let rule = rule_score(&signals);

        // Optional LLM adjustment.
        let mut llm_summary = None;
        let mut llm_details = None;
        let mut llm_adjustment: i16 = 0;
        let mut llm_attempted = false;
        let mut llm_succeeded = false;

        if let Some(adjuster) = &self.llm {
            llm_attempted = true;
            let request = AssessmentRequest {
                submitted: &submitted,
                discovered: &discovered,
                signals: &signals,
                rule_score: rule,
            };
            match adjuster.assess(&request).await {
                Ok(assessment) => {
                    let assessment = assessment.clamped();
                    info!(
                        adjustment = assessment.llm_score_adjustment,
                        "LLM assessment complete"
                    );
                    llm_adjustment = assessment.llm_score_adjustment;
                    llm_summary = Some(assessment.llm_summary);
                    llm_details = Some(assessment.llm_details);
                    llm_succeeded = true;
                    self.metrics
                        .record_integration_success(Check::LlmProcessing.as_str());
                }
                Err(e) => {
                    warn!(error = %e, "LLM assessment failed");
                    failed.insert(Check::LlmProcessing);
                    self.metrics.record_integration_failure(
                        Check::LlmProcessing.as_str(),
                        "retries_exhausted",
                    );
                }
            }
        }

        let final_risk_score = if llm_attempted {
            hybrid_score(rule, llm_adjustment)
        } else {
            rule
        };

        let is_complete =
            successful.len() >= 3 && failed.is_empty() && (!llm_attempted || llm_succeeded);

        let failed_checks: Vec<Check> = failed.iter().copied().collect();
        let successful_checks: Vec<Check> = successful.iter().copied().collect();

        info!(
            rule_score = rule,
            llm_adjustment,
            final_risk_score,
            is_complete,
            failed_checks = failed_checks.len(),
            "saving analysis"
        );

        let analysis = self
            .store
            .save_analysis(NewAnalysis {
                company_id: company.id,
                risk_score: final_risk_score,
                signals,
                failed_checks: failed_checks.clone(),
                submitted_data: submitted,
                discovered_data: discovered,
                is_complete,
                algorithm_version: self.config.algorithm_version.clone(),
                llm_summary,
                llm_details,
            })
            .await?;

        let duration = ctx.elapsed();
        if is_complete {
            self.metrics.record_analysis_success(duration);
        } else if failed_checks.is_empty() {
            self.metrics.record_analysis_failure("unknown");
        } else {
            self.metrics.record_analysis_incomplete(failed_checks.len());
        }
        self.metrics.record_worker_execution_duration(duration);

        Ok(RunReport {
            rule_score: rule,
            llm_adjustment,
            final_risk_score,
            is_complete,
            successful_checks,
            failed_checks,
            duration,
            analysis,
        })
    }
}
