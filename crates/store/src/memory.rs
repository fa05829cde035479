//! In-memory store backend.
//!
//! Observable semantics match the Postgres backend; used by orchestrator
//! tests and local development where a database is overkill.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use vouch_core::{
    classify_after_analysis, Analysis, AnalysisId, AnalysisStatus, Check, Company, CompanyEdits,
    CompanyId, CompanyStatus, NewAnalysis, StatusAction, auto_approve_eligible,
};

use crate::error::StoreError;
use crate::store::VerificationStore;

#[derive(Debug, Default)]
struct Inner {
    companies: HashMap<CompanyId, Company>,
    analyses: HashMap<CompanyId, Vec<Analysis>>,
}

/// Mutex-guarded maps with the same row semantics as Postgres.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn create_company(&self, company: Company) -> Result<Company, StoreError> {
        let mut inner = self.inner.lock();
        inner.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn fetch_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.inner.lock().companies.get(&id).cloned())
    }

    async fn fetch_latest_analysis(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<Analysis>, StoreError> {
        Ok(self
            .inner
            .lock()
            .analyses
            .get(&company_id)
            .and_then(|list| list.iter().max_by_key(|a| a.version))
            .cloned())
    }

    async fn update_company_step(
        &self,
        id: CompanyId,
        step: Check,
        status: Option<AnalysisStatus>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(company) = inner.companies.get_mut(&id) {
            company.current_step = Some(step.as_str().to_owned());
            if let Some(status) = status {
                company.analysis_status = status;
            }
            company.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_company_analysis_status(
        &self,
        id: CompanyId,
        status: AnalysisStatus,
        current_step: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let company = inner
            .companies
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        company.analysis_status = status;
        if let Some(step) = current_step {
            company.current_step = Some(step.to_owned());
        }
        if status == AnalysisStatus::Complete {
            if current_step.is_none() {
                company.current_step = Some("complete".to_owned());
            }
            company.last_analyzed_at = Some(Utc::now());
        }
        company.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_analysis_failed(&self, id: CompanyId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let company = inner
            .companies
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        company.analysis_status = AnalysisStatus::Complete;
        company.current_step = Some("complete".to_owned());
        company.last_analyzed_at = Some(Utc::now());
        company.status = classify_after_analysis(company.status, company.risk_score, false);
        company.updated_at = Utc::now();
        Ok(())
    }

    async fn save_analysis(&self, new: NewAnalysis) -> Result<Analysis, StoreError> {
        let mut inner = self.inner.lock();
        let company = inner
            .companies
            .get_mut(&new.company_id)
            .ok_or(StoreError::NotFound(new.company_id))?;

        let now = Utc::now();
        company.risk_score = new.risk_score;
        company.analysis_status = AnalysisStatus::Complete;
        company.current_step = Some("complete".to_owned());
        company.last_analyzed_at = Some(now);
        company.status = classify_after_analysis(company.status, new.risk_score, new.is_complete);
        company.updated_at = now;

        let analyses = inner.analyses.entry(new.company_id).or_default();
        let version = analyses.iter().map(|a| a.version).max().unwrap_or(0) + 1;

        let analysis = Analysis {
            id: AnalysisId::new(),
            company_id: new.company_id,
            version,
            algorithm_version: new.algorithm_version,
            submitted_data: new.submitted_data,
            discovered_data: new.discovered_data,
            signals: new.signals,
            risk_score: new.risk_score,
            llm_summary: new.llm_summary,
            llm_details: new.llm_details,
            is_complete: new.is_complete,
            failed_checks: new.failed_checks,
            created_at: now,
        };
        analyses.push(analysis.clone());
        Ok(analysis)
    }

    async fn update_company_details(
        &self,
        id: CompanyId,
        edits: CompanyEdits,
    ) -> Result<Company, StoreError> {
        let mut inner = self.inner.lock();
        let company = inner
            .companies
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if company.last_analyzed_at.is_some() {
            return Err(StoreError::PreconditionFailed(
                "declared attributes are immutable after analysis; request re-analysis".into(),
            ));
        }

        if let Some(name) = edits.name {
            company.name = name;
        }
        if let Some(domain) = edits.domain {
            company.domain = domain;
        }
        if let Some(website_url) = edits.website_url {
            company.website_url = Some(website_url);
        }
        if let Some(email) = edits.email {
            company.email = Some(email);
        }
        if let Some(phone) = edits.phone {
            company.phone = Some(phone);
        }
        company.updated_at = Utc::now();
        Ok(company.clone())
    }

    async fn apply_status_action(
        &self,
        id: CompanyId,
        action: StatusAction,
    ) -> Result<Company, StoreError> {
        let mut inner = self.inner.lock();
        let company = inner
            .companies
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        let next = company
            .status
            .apply(action)
            .map_err(|e| StoreError::PreconditionFailed(e.to_string()))?;
        company.status = next;
        company.updated_at = Utc::now();
        Ok(company.clone())
    }

    async fn auto_approve_if_eligible(&self, id: CompanyId) -> Result<Company, StoreError> {
        let mut inner = self.inner.lock();
        let company = inner
            .companies
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if !auto_approve_eligible(company.status, company.analysis_status, company.risk_score) {
            return Err(StoreError::PreconditionFailed(format!(
                "not eligible for auto-approval: status={}, analysis_status={}, risk_score={}",
                company.status, company.analysis_status, company.risk_score
            )));
        }

        company.status = CompanyStatus::Approved;
        company.updated_at = Utc::now();
        Ok(company.clone())
    }

    async fn delete_company(&self, id: CompanyId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let existed = inner.companies.remove(&id).is_some();
        inner.analyses.remove(&id);
        Ok(existed)
    }
}
