//! Idempotent schema setup for the Postgres store.

use sqlx::PgPool;

/// Statements are `IF NOT EXISTS` so startup can run them unconditionally.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS companies (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        domain VARCHAR(255) NOT NULL,
        website_url VARCHAR(500),
        email VARCHAR(255),
        phone VARCHAR(50),
        status TEXT NOT NULL DEFAULT 'pending',
        risk_score SMALLINT NOT NULL DEFAULT 0,
        analysis_status TEXT NOT NULL DEFAULT 'pending',
        current_step VARCHAR(50),
        last_analyzed_at TIMESTAMPTZ,
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS idx_companies_domain ON companies (domain)",
    "CREATE INDEX IF NOT EXISTS idx_companies_status ON companies (status)",
    "CREATE TABLE IF NOT EXISTS company_analyses (
        id UUID PRIMARY KEY,
        company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
        version INTEGER NOT NULL,
        algorithm_version VARCHAR(50) NOT NULL,
        submitted_data JSONB NOT NULL,
        discovered_data JSONB NOT NULL,
        signals JSONB NOT NULL,
        risk_score SMALLINT NOT NULL,
        llm_summary TEXT,
        llm_details TEXT,
        is_complete BOOLEAN NOT NULL DEFAULT TRUE,
        failed_checks JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (company_id, version)
    )",
    "CREATE INDEX IF NOT EXISTS idx_company_analyses_company
        ON company_analyses (company_id, created_at DESC)",
];

/// Run all migrations against the pool.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
