//! Conformance suite run against every store backend.
//!
//! Backends must agree on observable semantics; memory runs this in unit
//! tests and Postgres behind the `integration` feature.

use vouch_core::{
    AnalysisStatus, Check, Company, CompanyEdits, CompanyStatus, DiscoveredData, NewAnalysis,
    Signal, StatusAction,
};

use crate::error::StoreError;
use crate::store::VerificationStore;

fn sample_company() -> Company {
    Company::new("NovaGeo", "novageo.io")
        .with_email("info@novageo.io")
        .with_phone("+15551234567")
}

fn sample_analysis(company: &Company, risk_score: i16, is_complete: bool) -> NewAnalysis {
    NewAnalysis {
        company_id: company.id,
        risk_score,
        signals: vec![Signal::ok("domain_age", "812 days")],
        failed_checks: Vec::new(),
        submitted_data: company.submitted_data(),
        discovered_data: DiscoveredData::new(),
        is_complete,
        algorithm_version: "1.0.0".to_owned(),
        llm_summary: None,
        llm_details: None,
    }
}

/// Exercise one backend against the shared semantics.
pub async fn run_store_conformance_tests<S: VerificationStore>(
    store: &S,
) -> Result<(), StoreError> {
    // Create + fetch roundtrip.
    let company = store.create_company(sample_company()).await?;
    let fetched = store.fetch_company(company.id).await?.expect("created row");
    assert_eq!(fetched.domain, "novageo.io");
    assert_eq!(fetched.status, CompanyStatus::Pending);
    assert_eq!(fetched.analysis_status, AnalysisStatus::Pending);

    // No analysis yet.
    assert!(store.fetch_latest_analysis(company.id).await?.is_none());

    // Step updates are idempotent and can move the analysis status.
    store
        .update_company_step(company.id, Check::Whois, Some(AnalysisStatus::InProgress))
        .await?;
    store
        .update_company_step(company.id, Check::Whois, Some(AnalysisStatus::InProgress))
        .await?;
    let fetched = store.fetch_company(company.id).await?.expect("row");
    assert_eq!(fetched.current_step.as_deref(), Some("whois"));
    assert_eq!(fetched.analysis_status, AnalysisStatus::InProgress);

    // Declared attributes editable before any analysis.
    let edited = store
        .update_company_details(
            company.id,
            CompanyEdits {
                phone: Some("+15559876543".to_owned()),
                ..CompanyEdits::default()
            },
        )
        .await?;
    assert_eq!(edited.phone.as_deref(), Some("+15559876543"));

    // First save: version 1, complete + low score auto-approves.
    let first = store.save_analysis(sample_analysis(&company, 10, true)).await?;
    assert_eq!(first.version, 1);
    let fetched = store.fetch_company(company.id).await?.expect("row");
    assert_eq!(fetched.risk_score, 10);
    assert_eq!(fetched.status, CompanyStatus::Approved);
    assert_eq!(fetched.analysis_status, AnalysisStatus::Complete);
    assert_eq!(fetched.current_step.as_deref(), Some("complete"));
    assert!(fetched.last_analyzed_at.is_some());

    // Second save: strictly increasing version, latest wins.
    let second = store.save_analysis(sample_analysis(&company, 80, true)).await?;
    assert_eq!(second.version, 2);
    let latest = store
        .fetch_latest_analysis(company.id)
        .await?
        .expect("latest analysis");
    assert_eq!(latest.version, 2);
    assert!(first.created_at <= latest.created_at);
    let fetched = store.fetch_company(company.id).await?.expect("row");
    assert_eq!(fetched.status, CompanyStatus::Fraudulent);

    // Immutability after analysis.
    let err = store
        .update_company_details(
            company.id,
            CompanyEdits {
                name: Some("Rebrand Co".to_owned()),
                ..CompanyEdits::default()
            },
        )
        .await
        .expect_err("edits after analysis must fail");
    assert!(matches!(err, StoreError::PreconditionFailed(_)));

    // Invalid operator action does not mutate state.
    let err = store
        .apply_status_action(company.id, StatusAction::Approve)
        .await
        .expect_err("approve from fraudulent must fail");
    assert!(matches!(err, StoreError::PreconditionFailed(_)));
    let fetched = store.fetch_company(company.id).await?.expect("row");
    assert_eq!(fetched.status, CompanyStatus::Fraudulent);

    // Auto-approval: ineligible here (fraudulent, high score).
    let err = store
        .auto_approve_if_eligible(company.id)
        .await
        .expect_err("fraudulent company is not eligible");
    assert!(matches!(err, StoreError::PreconditionFailed(_)));

    // A pending company with a complete low-score analysis is eligible for
    // the explicit auto-approve operation.
    let manual = store.create_company(sample_company()).await?;
    store
        .update_company_analysis_status(manual.id, AnalysisStatus::Complete, None)
        .await?;
    let approved = store.auto_approve_if_eligible(manual.id).await?;
    assert_eq!(approved.status, CompanyStatus::Approved);

    // Operator transitions that are permitted.
    let reviewed = store.create_company(sample_company()).await?;
    let rejected = store
        .apply_status_action(reviewed.id, StatusAction::Reject)
        .await?;
    assert_eq!(rejected.status, CompanyStatus::Suspicious);

    // A failed run classifies as suspicious, never fraudulent by itself.
    let failed_run = store.create_company(sample_company()).await?;
    store.mark_analysis_failed(failed_run.id).await?;
    let fetched = store.fetch_company(failed_run.id).await?.expect("row");
    assert_eq!(fetched.status, CompanyStatus::Suspicious);
    assert_eq!(fetched.analysis_status, AnalysisStatus::Complete);

    // Deletion cascades to analyses.
    assert!(store.delete_company(company.id).await?);
    assert!(store.fetch_company(company.id).await?.is_none());
    assert!(store.fetch_latest_analysis(company.id).await?.is_none());
    assert!(!store.delete_company(company.id).await?);

    Ok(())
}
