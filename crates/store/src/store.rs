use async_trait::async_trait;

use vouch_core::{
    Analysis, AnalysisStatus, Check, Company, CompanyEdits, CompanyId, NewAnalysis, StatusAction,
};

use crate::error::StoreError;

/// Trait for persisting companies and their versioned analyses.
///
/// Implementations must be `Send + Sync` and safe for concurrent callers;
/// the store is the sole mutator of company and analysis rows.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Insert a new company row.
    async fn create_company(&self, company: Company) -> Result<Company, StoreError>;

    /// Fetch a company by id. Soft-deleted rows are returned with their
    /// `is_deleted` flag set; the caller decides how to treat them.
    async fn fetch_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError>;

    /// Fetch the most recent analysis for a company, if any.
    async fn fetch_latest_analysis(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<Analysis>, StoreError>;

    /// Record the pipeline's current step, optionally moving the analysis
    /// status. Idempotent single-row update; missing rows are a no-op.
    async fn update_company_step(
        &self,
        id: CompanyId,
        step: Check,
        status: Option<AnalysisStatus>,
    ) -> Result<(), StoreError>;

    /// Set the analysis status directly.
    ///
    /// Transitioning to `complete` stamps `last_analyzed_at` and defaults
    /// `current_step` to `complete`.
    async fn update_company_analysis_status(
        &self,
        id: CompanyId,
        status: AnalysisStatus,
        current_step: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Close out a run that died before producing an analysis: the run is
    /// marked over and the company classified as an incomplete result
    /// (suspicious unless already fraudulent).
    async fn mark_analysis_failed(&self, id: CompanyId) -> Result<(), StoreError>;

    /// Persist a completed run atomically.
    ///
    /// Locks the company row, assigns `version = max(version) + 1`, inserts
    /// the analysis, updates the company (risk score, `analysis_status =
    /// complete`, `current_step = complete`, `last_analyzed_at`), and applies
    /// the post-analysis status classification. Returns the stored analysis
    /// with its assigned version.
    async fn save_analysis(&self, analysis: NewAnalysis) -> Result<Analysis, StoreError>;

    /// Edit declared attributes.
    ///
    /// Fails with a precondition error once the company has ever been
    /// analyzed; callers must request re-analysis instead.
    async fn update_company_details(
        &self,
        id: CompanyId,
        edits: CompanyEdits,
    ) -> Result<Company, StoreError>;

    /// Apply an operator status action through the status machine.
    ///
    /// Invalid `(state, action)` pairs fail with a precondition error and do
    /// not mutate the row.
    async fn apply_status_action(
        &self,
        id: CompanyId,
        action: StatusAction,
    ) -> Result<Company, StoreError>;

    /// Idempotent auto-approval, used by both the post-analysis path and the
    /// operator-facing endpoint. Requires a complete analysis, a risk score
    /// of at most 30, and pending status; anything else is a precondition
    /// failure.
    async fn auto_approve_if_eligible(&self, id: CompanyId) -> Result<Company, StoreError>;

    /// Delete a company and cascade to its analyses. Returns whether a row
    /// was removed.
    async fn delete_company(&self, id: CompanyId) -> Result<bool, StoreError>;
}
