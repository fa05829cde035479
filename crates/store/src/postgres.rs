//! PostgreSQL-backed implementation of [`VerificationStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};
use uuid::Uuid;

use vouch_core::{
    classify_after_analysis, Analysis, AnalysisId, AnalysisStatus, Check, Company, CompanyEdits,
    CompanyId, CompanyStatus, NewAnalysis, StatusAction, auto_approve_eligible,
};

use crate::config::PostgresConfig;
use crate::error::StoreError;
use crate::migrations;
use crate::store::VerificationStore;

const COMPANY_COLUMNS: &str = "id, name, domain, website_url, email, phone, status, risk_score, \
     analysis_status, current_step, last_analyzed_at, is_deleted, created_at, updated_at";

const ANALYSIS_COLUMNS: &str = "id, company_id, version, algorithm_version, submitted_data, \
     discovered_data, signals, risk_score, llm_summary, llm_details, is_complete, failed_checks, \
     created_at";

/// Versioning uses a row-level lock plus a read of the current maximum, so
/// concurrent saves for the same company serialize on the company row and
/// versions stay strictly increasing without gaps being required.
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    domain: String,
    website_url: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    status: String,
    risk_score: i16,
    analysis_status: String,
    current_step: Option<String>,
    last_analyzed_at: Option<DateTime<Utc>>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CompanyRow> for Company {
    type Error = StoreError;

    fn try_from(row: CompanyRow) -> Result<Self, Self::Error> {
        let status: CompanyStatus = row
            .status
            .parse()
            .map_err(|e: vouch_core::CoreError| StoreError::Serialization(e.to_string()))?;
        let analysis_status: AnalysisStatus = row
            .analysis_status
            .parse()
            .map_err(|e: vouch_core::CoreError| StoreError::Serialization(e.to_string()))?;

        Ok(Company {
            id: CompanyId::from_uuid(row.id),
            name: row.name,
            domain: row.domain,
            website_url: row.website_url,
            email: row.email,
            phone: row.phone,
            status,
            risk_score: row.risk_score,
            analysis_status,
            current_step: row.current_step,
            last_analyzed_at: row.last_analyzed_at,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnalysisRow {
    id: Uuid,
    company_id: Uuid,
    version: i32,
    algorithm_version: String,
    submitted_data: serde_json::Value,
    discovered_data: serde_json::Value,
    signals: serde_json::Value,
    risk_score: i16,
    llm_summary: Option<String>,
    llm_details: Option<String>,
    is_complete: bool,
    failed_checks: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRow> for Analysis {
    type Error = StoreError;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        fn json<T: serde::de::DeserializeOwned>(
            value: serde_json::Value,
        ) -> Result<T, StoreError> {
            serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
        }

        Ok(Analysis {
            id: AnalysisId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            version: row.version,
            algorithm_version: row.algorithm_version,
            submitted_data: json(row.submitted_data)?,
            discovered_data: json(row.discovered_data)?,
            signals: json(row.signals)?,
            risk_score: row.risk_score,
            llm_summary: row.llm_summary,
            llm_details: row.llm_details,
            is_complete: row.is_complete,
            failed_checks: json(row.failed_checks)?,
            created_at: row.created_at,
        })
    }
}

impl PostgresStore {
    /// Connect, build the pool, and run migrations.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        migrations::run_migrations(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        info!("postgres store initialized");
        Ok(Self { pool })
    }

    /// Create a store from an existing pool. Runs migrations.
    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        migrations::run_migrations(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn lock_company(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: CompanyId,
    ) -> Result<Company, StoreError> {
        let query = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1 FOR UPDATE");
        let row: Option<CompanyRow> = sqlx::query_as(&query)
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.ok_or(StoreError::NotFound(id))?.try_into()
    }
}

#[async_trait]
impl VerificationStore for PostgresStore {
    async fn create_company(&self, company: Company) -> Result<Company, StoreError> {
        let query = format!(
            "INSERT INTO companies ({COMPANY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&query)
            .bind(company.id.as_uuid())
            .bind(&company.name)
            .bind(&company.domain)
            .bind(&company.website_url)
            .bind(&company.email)
            .bind(&company.phone)
            .bind(company.status.as_str())
            .bind(company.risk_score)
            .bind(company.analysis_status.as_str())
            .bind(&company.current_step)
            .bind(company.last_analyzed_at)
            .bind(company.is_deleted)
            .bind(company.created_at)
            .bind(company.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(company)
    }

    async fn fetch_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        let query = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1");
        let row: Option<CompanyRow> = sqlx::query_as(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(Company::try_from).transpose()
    }

    async fn fetch_latest_analysis(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<Analysis>, StoreError> {
        let query = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM company_analyses \
             WHERE company_id = $1 ORDER BY version DESC LIMIT 1"
        );
        let row: Option<AnalysisRow> = sqlx::query_as(&query)
            .bind(company_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(Analysis::try_from).transpose()
    }

    async fn update_company_step(
        &self,
        id: CompanyId,
        step: Check,
        status: Option<AnalysisStatus>,
    ) -> Result<(), StoreError> {
        let result = match status {
            Some(status) => {
                sqlx::query(
                    "UPDATE companies SET current_step = $2, analysis_status = $3, \
                     updated_at = NOW() WHERE id = $1",
                )
                .bind(id.as_uuid())
                .bind(step.as_str())
                .bind(status.as_str())
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "UPDATE companies SET current_step = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(id.as_uuid())
                .bind(step.as_str())
                .execute(&self.pool)
                .await
            }
        };

        result.map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(company_id = %id, step = %step, "updated company step");
        Ok(())
    }

    async fn update_company_analysis_status(
        &self,
        id: CompanyId,
        status: AnalysisStatus,
        current_step: Option<&str>,
    ) -> Result<(), StoreError> {
        let step = match (status, current_step) {
            (AnalysisStatus::Complete, None) => Some("complete"),
            (_, step) => step,
        };
        let stamp_analyzed = status == AnalysisStatus::Complete;

        let result = sqlx::query(
            "UPDATE companies SET analysis_status = $2, \
             current_step = COALESCE($3, current_step), \
             last_analyzed_at = CASE WHEN $4 THEN NOW() ELSE last_analyzed_at END, \
             updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(step)
        .bind(stamp_analyzed)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_analysis_failed(&self, id: CompanyId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let company = Self::lock_company(&mut tx, id).await?;
        let status = classify_after_analysis(company.status, company.risk_score, false);

        sqlx::query(
            "UPDATE companies SET analysis_status = 'complete', current_step = 'complete', \
             last_analyzed_at = NOW(), status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn save_analysis(&self, new: NewAnalysis) -> Result<Analysis, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let company = Self::lock_company(&mut tx, new.company_id).await?;

        let (next_version,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM company_analyses WHERE company_id = $1",
        )
        .bind(new.company_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let submitted = serde_json::to_value(&new.submitted_data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let discovered = serde_json::to_value(&new.discovered_data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let signals = serde_json::to_value(&new.signals)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let failed_checks = serde_json::to_value(&new.failed_checks)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let analysis_id = AnalysisId::new();
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO company_analyses (id, company_id, version, algorithm_version, \
             submitted_data, discovered_data, signals, risk_score, llm_summary, llm_details, \
             is_complete, failed_checks, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(analysis_id.as_uuid())
        .bind(new.company_id.as_uuid())
        .bind(next_version)
        .bind(&new.algorithm_version)
        .bind(&submitted)
        .bind(&discovered)
        .bind(&signals)
        .bind(new.risk_score)
        .bind(&new.llm_summary)
        .bind(&new.llm_details)
        .bind(new.is_complete)
        .bind(&failed_checks)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let status = classify_after_analysis(company.status, new.risk_score, new.is_complete);
        sqlx::query(
            "UPDATE companies SET risk_score = $2, analysis_status = 'complete', \
             current_step = 'complete', last_analyzed_at = $3, status = $4, updated_at = $3 \
             WHERE id = $1",
        )
        .bind(new.company_id.as_uuid())
        .bind(new.risk_score)
        .bind(created_at)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        info!(
            company_id = %new.company_id,
            version = next_version,
            risk_score = new.risk_score,
            is_complete = new.is_complete,
            "analysis saved"
        );

        Ok(Analysis {
            id: analysis_id,
            company_id: new.company_id,
            version: next_version,
            algorithm_version: new.algorithm_version,
            submitted_data: new.submitted_data,
            discovered_data: new.discovered_data,
            signals: new.signals,
            risk_score: new.risk_score,
            llm_summary: new.llm_summary,
            llm_details: new.llm_details,
            is_complete: new.is_complete,
            failed_checks: new.failed_checks,
            created_at,
        })
    }

    async fn update_company_details(
        &self,
        id: CompanyId,
        edits: CompanyEdits,
    ) -> Result<Company, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut company = Self::lock_company(&mut tx, id).await?;
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

        sqlx::query(
            "UPDATE companies SET name = $2, domain = $3, website_url = $4, email = $5, \
             phone = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&company.name)
        .bind(&company.domain)
        .bind(&company.website_url)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(company.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(company)
    }

    async fn apply_status_action(
        &self,
        id: CompanyId,
        action: StatusAction,
    ) -> Result<Company, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut company = Self::lock_company(&mut tx, id).await?;
        let next = company
            .status
            .apply(action)
            .map_err(|e| StoreError::PreconditionFailed(e.to_string()))?;

        company.status = next;
        company.updated_at = Utc::now();

        sqlx::query("UPDATE companies SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(next.as_str())
            .bind(company.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(company)
    }

    async fn auto_approve_if_eligible(&self, id: CompanyId) -> Result<Company, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut company = Self::lock_company(&mut tx, id).await?;
        if !auto_approve_eligible(company.status, company.analysis_status, company.risk_score) {
            return Err(StoreError::PreconditionFailed(format!(
                "not eligible for auto-approval: status={}, analysis_status={}, risk_score={}",
                company.status, company.analysis_status, company.risk_score
            )));
        }

        company.status = CompanyStatus::Approved;
        company.updated_at = Utc::now();

        sqlx::query("UPDATE companies SET status = 'approved', updated_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(company.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(company)
    }

    async fn delete_company(&self, id: CompanyId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
