//! In-process counters for pipeline outcomes.
//!
//! All counters use relaxed ordering for throughput; call
//! [`snapshot`](VerificationMetrics::snapshot) for a consistent
//! point-in-time view. Export to an external metrics backend is a transport
//! concern and lives outside the pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

/// Metric namespace used in emissions.
pub const NAMESPACE: &str = "verification";

#[derive(Debug, Default)]
struct IntegrationStats {
    successes: AtomicU64,
    failures: AtomicU64,
    last_error_type: parking_lot::Mutex<Option<String>>,
}

#[derive(Debug, Default)]
struct DurationStats {
    total_ms: AtomicU64,
    count: AtomicU64,
}

impl DurationStats {
    fn record(&self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn average_ms(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.total_ms.load(Ordering::Relaxed) as f64 / count as f64
        }
    }
}

/// Atomic counters tracking verification outcomes.
#[derive(Debug, Default)]
pub struct VerificationMetrics {
    /// Complete analyses persisted.
    analysis_success: AtomicU64,
    /// Analyses persisted with failed checks.
    analysis_incomplete: AtomicU64,
    /// Runs that produced no analysis at all.
    analysis_failure: AtomicU64,
    /// Total failed checks across incomplete analyses.
    failed_checks_total: AtomicU64,
    /// Per-integration success/failure counts.
    integrations: parking_lot::RwLock<HashMap<String, IntegrationStats>>,
    /// End-to-end analysis durations.
    analysis_duration: DurationStats,
    /// Worker execution durations (per queue record).
    worker_duration: DurationStats,
}

impl VerificationMetrics {
    /// Fresh zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a complete analysis and its duration.
    pub fn record_analysis_success(&self, duration: Duration) {
        self.analysis_success.fetch_add(1, Ordering::Relaxed);
        self.analysis_duration.record(duration);
        debug!(namespace = NAMESPACE, metric = "AnalysisSuccess", "metric emitted");
    }

    /// Record an analysis persisted with failed checks.
    pub fn record_analysis_incomplete(&self, failed_checks: usize) {
        self.analysis_incomplete.fetch_add(1, Ordering::Relaxed);
        self.failed_checks_total
            .fetch_add(failed_checks as u64, Ordering::Relaxed);
        debug!(
            namespace = NAMESPACE,
            metric = "AnalysisIncomplete",
            failed_checks,
            "metric emitted"
        );
    }

    /// Record a run that produced no analysis.
    pub fn record_analysis_failure(&self, error_type: &str) {
        self.analysis_failure.fetch_add(1, Ordering::Relaxed);
        debug!(
            namespace = NAMESPACE,
            metric = "AnalysisFailure",
            error_type,
            "metric emitted"
        );
    }

    /// Record a successful integration check.
    pub fn record_integration_success(&self, integration: &str) {
        self.with_integration(integration, |stats| {
            stats.successes.fetch_add(1, Ordering::Relaxed);
        });
        debug!(
            namespace = NAMESPACE,
            metric = "IntegrationCheck",
            integration,
            status = "success",
            "metric emitted"
        );
    }

    /// Record a failed integration check with its error type.
    pub fn record_integration_failure(&self, integration: &str, error_type: &str) {
        self.with_integration(integration, |stats| {
            stats.failures.fetch_add(1, Ordering::Relaxed);
            *stats.last_error_type.lock() = Some(error_type.to_owned());
        });
        debug!(
            namespace = NAMESPACE,
            metric = "IntegrationCheck",
            integration,
            status = "failure",
            error_type,
            "metric emitted"
        );
    }

    /// Record the wall-clock duration of one worker record.
    pub fn record_worker_execution_duration(&self, duration: Duration) {
        self.worker_duration.record(duration);
        debug!(
            namespace = NAMESPACE,
            metric = "WorkerExecutionDuration",
            millis = duration.as_millis() as u64,
            "metric emitted"
        );
    }

    fn with_integration(&self, integration: &str, f: impl FnOnce(&IntegrationStats)) {
        let map = self.integrations.read();
        if let Some(stats) = map.get(integration) {
            f(stats);
            return;
        }
        drop(map);
        let mut map = self.integrations.write();
        f(map.entry(integration.to_owned()).or_default());
    }

    /// Take a consistent point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let integrations = self
            .integrations
            .read()
            .iter()
            .map(|(name, stats)| {
                (
                    name.clone(),
                    IntegrationSnapshot {
                        successes: stats.successes.load(Ordering::Relaxed),
                        failures: stats.failures.load(Ordering::Relaxed),
                        last_error_type: stats.last_error_type.lock().clone(),
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            analysis_success: self.analysis_success.load(Ordering::Relaxed),
            analysis_incomplete: self.analysis_incomplete.load(Ordering::Relaxed),
            analysis_failure: self.analysis_failure.load(Ordering::Relaxed),
            failed_checks_total: self.failed_checks_total.load(Ordering::Relaxed),
            avg_analysis_duration_ms: self.analysis_duration.average_ms(),
            avg_worker_duration_ms: self.worker_duration.average_ms(),
            integrations,
        }
    }
}

/// Point-in-time view of one integration's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationSnapshot {
    pub successes: u64,
    pub failures: u64,
    pub last_error_type: Option<String>,
}

/// Plain-data snapshot of [`VerificationMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub analysis_success: u64,
    pub analysis_incomplete: u64,
    pub analysis_failure: u64,
    pub failed_checks_total: u64,
    pub avg_analysis_duration_ms: f64,
    pub avg_worker_duration_ms: f64,
    pub integrations: HashMap<String, IntegrationSnapshot>,
}
