//! End-to-end probe runs against a SQL Server container.
//!
//! Run with:
//!   cargo test -p mssql-probe-testing --test container -- --ignored --nocapture

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use mssql_probe::{CheckKind, Outcome, Runner, sample};
use mssql_probe_testing::{ProbeServer, SqlServerImage};

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_full_run_against_fresh_server() {
    let server = ProbeServer::start(SqlServerImage::default(), "app_schema")
        .await
        .expect("Failed to start SQL Server container");
    server
        .install_sample()
        .await
        .expect("Failed to install sample schema");

    let report = Runner::standard().run(&server.context(), |_| {}).await;

    assert_eq!(report.sections.len(), CheckKind::ALL.len());
    for section in &report.sections {
        assert!(
            section.outcome.is_passed(),
            "{} failed on container {}: {:?}",
            section.check,
            server.id(),
            section.outcome
        );
    }
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_data_checks_fail_with_hint_after_teardown() {
    let server = ProbeServer::start(SqlServerImage::default(), "app_schema")
        .await
        .expect("Failed to start SQL Server container");
    server.install_sample().await.unwrap();
    sample::remove(&server.context()).await.unwrap();

    let report = Runner::standard()
        .select(&[CheckKind::Basic, CheckKind::Operations], &[])
        .run(&server.context(), |_| {})
        .await;

    assert!(report.sections[0].outcome.is_passed());
    match &report.sections[1].outcome {
        Outcome::Failed { hint, .. } => {
            assert!(hint.as_deref().is_some_and(|h| h.contains("mssql-probe setup")));
        }
        Outcome::Passed => panic!("operations should fail without the sample schema"),
    }
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_missing_database_is_reported() {
    let server = ProbeServer::start(SqlServerImage::default(), "never_created")
        .await
        .expect("Failed to start SQL Server container");

    let report = Runner::standard()
        .select(&[CheckKind::Basic], &[])
        .run(&server.context(), |_| {})
        .await;

    assert!(!report.is_success());
    assert_eq!(report.failed(), 1);
}
