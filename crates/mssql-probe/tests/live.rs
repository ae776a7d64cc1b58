//! Live checks against a running SQL Server.
//!
//! All tests marked with `#[ignore]` require a server reachable through the
//! `MSSQL_*` environment variables.
//!
//! Run with:
//!   MSSQL_HOST=localhost \
//!   MSSQL_PASSWORD=YourStrong@Passw0rd \
//!   cargo test -p mssql-probe --test live -- --ignored --nocapture --test-threads=1

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use mssql_client::{Error, RowIteratorExt};
use mssql_probe::checks::{TEST_EMPLOYEE_EMAIL, TEST_EMPLOYEE_SALARY, TEST_EMPLOYEE_TITLE};
use mssql_probe::sample::{Department, IT_DEPARTMENT_ID};
use mssql_probe::{
    CheckKind, ConnectionSettings, Line, Outcome, ProbeConfig, ProbeContext, ProbeError, Report,
    Runner, sample,
};
use rust_decimal::Decimal;

// =============================================================================
// Helpers
// =============================================================================

fn live_config() -> ProbeConfig {
    ProbeConfig::from_env().expect("valid MSSQL_* environment")
}

fn live_context() -> ProbeContext {
    ProbeContext::new(live_config())
}

async fn run_only(ctx: &ProbeContext, kinds: &[CheckKind]) -> Report {
    Runner::standard().select(kinds, &[]).run(ctx, |_| {}).await
}

fn assert_passed(report: &Report) {
    for section in &report.sections {
        assert!(
            section.outcome.is_passed(),
            "{} failed: {:?}",
            section.check,
            section.outcome
        );
    }
}

fn texts(report: &Report) -> Vec<String> {
    report
        .sections
        .iter()
        .flat_map(|s| s.lines.iter())
        .map(|line| match line {
            Line::Detail { text, .. } | Line::Pass { text } | Line::Fail { text } => text.clone(),
        })
        .collect()
}

// =============================================================================
// Connection Checks
// =============================================================================

#[tokio::test]
#[ignore = "Requires SQL Server"]
async fn test_connection_checks_pass() {
    let ctx = live_context();
    let report = run_only(
        &ctx,
        &[CheckKind::Basic, CheckKind::Properties, CheckKind::Pool],
    )
    .await;

    assert_eq!(report.sections.len(), 3);
    assert_passed(&report);

    let lines = texts(&report);
    assert!(lines.iter().any(|l| l.starts_with("Database: Microsoft SQL")));
    assert!(lines.iter().any(|l| l == "Message: Hello SQL Server!"));
    assert!(lines.iter().any(|l| l == "Pool Connection 3"));
}

#[tokio::test]
#[ignore = "Requires SQL Server"]
async fn test_wrong_password_fails_with_login_hint() {
    let mut config = live_config();
    config.connection.password = "definitely-not-the-password".into();
    let ctx = ProbeContext::new(config);

    let report = run_only(&ctx, &[CheckKind::Basic]).await;

    assert!(!report.is_success());
    match &report.sections[0].outcome {
        Outcome::Failed { hint, .. } => {
            assert!(hint.as_deref().is_some_and(|h| h.contains("login failed")));
        }
        Outcome::Passed => panic!("login with a wrong password should fail"),
    }
}

// =============================================================================
// Sample Schema Checks
// =============================================================================

#[tokio::test]
#[ignore = "Requires SQL Server"]
async fn test_data_checks_against_sample_schema() {
    let ctx = live_context();
    sample::install(&ctx).await.expect("install sample schema");

    let report = run_only(
        &ctx,
        &[
            CheckKind::Operations,
            CheckKind::Queries,
            CheckKind::Prepared,
        ],
    )
    .await;
    assert_passed(&report);

    let lines = texts(&report);
    assert!(lines.iter().any(|l| l == "IT department has 3 employees"));
    assert!(lines.iter().any(|l| l == "IT department total budget: $248000.00"));
    assert!(lines.iter().any(|l| l == "Cleaned up test record"));
    assert!(lines.iter().any(|l| l == "2: Sarah Johnson - $85000.00"));
    assert!(!lines.iter().any(|l| l.contains("Michael Brown -")));
}

#[tokio::test]
#[ignore = "Requires SQL Server"]
async fn test_operations_remove_leftover_test_employee() {
    let ctx = live_context();
    sample::install(&ctx).await.expect("install sample schema");

    let mut client = ctx.connect().await.unwrap();
    client
        .execute(
            "INSERT INTO dbo.employees (first_name, last_name, email, job_title, salary, dept_id) \
             VALUES (@p1, @p2, @p3, @p4, @p5, @p6)",
            &[
                &"Left",
                &"Over",
                &TEST_EMPLOYEE_EMAIL,
                &TEST_EMPLOYEE_TITLE,
                &Decimal::from(TEST_EMPLOYEE_SALARY),
                &IT_DEPARTMENT_ID,
            ],
        )
        .await
        .expect("plant leftover test employee");

    let report = run_only(&ctx, &[CheckKind::Operations]).await;
    assert_passed(&report);
    assert_eq!(report.exit_status(), 0);

    let remaining: i32 = client
        .query(
            "SELECT COUNT(*) AS n FROM dbo.employees WHERE email = @p1",
            &[&TEST_EMPLOYEE_EMAIL],
        )
        .await
        .unwrap()
        .next()
        .expect("one row")
        .unwrap()
        .get_by_name("n")
        .unwrap();
    assert_eq!(remaining, 0);
    client.close().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires SQL Server"]
async fn test_nullable_columns_still_require_the_column() {
    let ctx = live_context();
    let mut client = ctx.connect().await.unwrap();

    let nulls: Vec<Department> = client
        .query(
            "SELECT 9 AS dept_id, N'Empty' AS dept_name, \
             CAST(NULL AS NVARCHAR(100)) AS location, CAST(NULL AS INT) AS manager_id",
            &[],
        )
        .await
        .unwrap()
        .map_rows::<Department>()
        .collect::<Result<_, Error>>()
        .unwrap();
    assert_eq!(nulls[0].location, None);
    assert_eq!(nulls[0].manager_id, None);

    let missing = client
        .query("SELECT 9 AS dept_id, N'Empty' AS dept_name", &[])
        .await
        .unwrap()
        .map_rows::<Department>()
        .collect::<Result<Vec<_>, Error>>();
    assert!(missing.is_err(), "a missing column must not read as NULL");

    let mistyped = client
        .query(
            "SELECT 9 AS dept_id, N'Empty' AS dept_name, 42 AS location, NULL AS manager_id",
            &[],
        )
        .await
        .unwrap()
        .map_rows::<Department>()
        .collect::<Result<Vec<_>, Error>>();
    assert!(mistyped.is_err(), "a mistyped column must not read as NULL");

    client.close().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires SQL Server"]
async fn test_install_is_idempotent() {
    let ctx = live_context();
    let first = sample::install(&ctx).await.unwrap();
    let second = sample::install(&ctx).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_install_rejects_unsafe_database_name() {
    let settings = ConnectionSettings {
        database: "bad]name".into(),
        ..ConnectionSettings::default()
    };
    let ctx = ProbeContext::new(ProbeConfig::new(settings));

    let result = sample::install(&ctx).await;
    assert!(matches!(result, Err(ProbeError::InvalidIdentifier(_))));
}
