//! Check trait and sequential runner.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use async_trait::async_trait;
use mssql_client::{Client, Ready};
use mssql_driver_pool::Pool;
use serde::Serialize;
use thiserror::Error;

use crate::checks;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::report::{Outcome, Report, Section, Transcript};

/// Title printed at the top of every run.
pub const REPORT_TITLE: &str = "SQL Server Connectivity Test";

/// Identifies a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Raw connection and server metadata.
    Basic,
    /// Connection with explicit timeouts and a simple query.
    Properties,
    /// Pooled connections.
    Pool,
    /// Select, insert/cleanup, stored procedure and function calls.
    Operations,
    /// Typed mapping of the sample tables.
    Queries,
    /// Parameterized filtering.
    Prepared,
}

impl CheckKind {
    /// Every check, in run order.
    pub const ALL: [CheckKind; 6] = [
        Self::Basic,
        Self::Properties,
        Self::Pool,
        Self::Operations,
        Self::Queries,
        Self::Prepared,
    ];

    /// Name used on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Properties => "properties",
            Self::Pool => "pool",
            Self::Operations => "operations",
            Self::Queries => "queries",
            Self::Prepared => "prepared",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized check name.
#[derive(Debug, Error)]
#[error("unknown check '{0}' (expected one of: basic, properties, pool, operations, queries, prepared)")]
pub struct UnknownCheck(pub String);

impl FromStr for CheckKind {
    type Err = UnknownCheck;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| UnknownCheck(s.to_string()))
    }
}

/// Shared state handed to every check.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    config: ProbeConfig,
}

impl ProbeContext {
    /// Create a context over the given configuration.
    #[must_use]
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// The probe configuration.
    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Open a connection with the base settings.
    pub async fn connect(&self) -> Result<Client<Ready>> {
        let config = self.config.client_config()?;
        tracing::debug!(host = %config.host, port = config.port, "opening connection");
        Ok(Client::connect(config).await?)
    }

    /// Open a connection with the tuned timeouts.
    pub async fn connect_tuned(&self) -> Result<Client<Ready>> {
        let config = self.config.tuned_client_config()?;
        tracing::debug!(
            host = %config.host,
            connect_timeout = ?config.connect_timeout,
            command_timeout = ?config.command_timeout,
            "opening tuned connection"
        );
        Ok(Client::connect(config).await?)
    }

    /// Open a connection to another database on the same server.
    pub async fn connect_to(&self, database: &str) -> Result<Client<Ready>> {
        let config = self.config.client_config_for(database)?;
        tracing::debug!(host = %config.host, database, "opening connection");
        Ok(Client::connect(config).await?)
    }

    /// Build a connection pool from the pool settings.
    pub async fn build_pool(&self) -> Result<Pool> {
        let pool_config = self.config.pool.to_pool_config()?;
        tracing::debug!(
            min = pool_config.min_connections,
            max = pool_config.max_connections,
            "building connection pool"
        );
        let pool = Pool::new(pool_config, self.config.client_config()?).await?;
        Ok(pool)
    }
}

/// A single connectivity check.
#[async_trait]
pub trait Check: Send + Sync {
    /// Which check this is.
    fn kind(&self) -> CheckKind;

    /// Section heading, e.g. "Testing basic connection".
    fn title(&self) -> &'static str;

    /// Subject used in failure lines, e.g. "Basic connection".
    fn label(&self) -> &'static str;

    /// Run the check, writing progress into `out`.
    ///
    /// Returning an error stops the check; the runner records it and moves
    /// on to the next one.
    async fn run(&self, ctx: &ProbeContext, out: &mut Transcript) -> Result<()>;
}

/// Runs checks one after another.
pub struct Runner {
    checks: Vec<Box<dyn Check>>,
}

impl Runner {
    /// Create a runner over an explicit list of checks.
    #[must_use]
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    /// Every built-in check in run order.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(checks::all())
    }

    /// Keep checks listed in `only` (all when empty) and not listed in `skip`.
    #[must_use]
    pub fn select(mut self, only: &[CheckKind], skip: &[CheckKind]) -> Self {
        self.checks.retain(|check| {
            let kind = check.kind();
            (only.is_empty() || only.contains(&kind)) && !skip.contains(&kind)
        });
        self
    }

    /// Kinds of the registered checks, in run order.
    #[must_use]
    pub fn kinds(&self) -> Vec<CheckKind> {
        self.checks.iter().map(|c| c.kind()).collect()
    }

    /// Run every check; `on_section` sees each section as soon as it finishes.
    pub async fn run<F>(&self, ctx: &ProbeContext, mut on_section: F) -> Report
    where
        F: FnMut(&Section),
    {
        let mut report = Report::new(REPORT_TITLE);

        for (i, check) in self.checks.iter().enumerate() {
            let section = run_one(check.as_ref(), i + 1, ctx).await;
            on_section(&section);
            report.sections.push(section);
        }

        report
    }
}

async fn run_one(check: &dyn Check, index: usize, ctx: &ProbeContext) -> Section {
    let started = Instant::now();
    let mut transcript = Transcript::new();

    let outcome = match check.run(ctx, &mut transcript).await {
        Ok(()) => Outcome::Passed,
        Err(err) => failure(check, &err, &mut transcript),
    };

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &outcome {
        Outcome::Passed => tracing::info!(check = %check.kind(), elapsed_ms, "check passed"),
        Outcome::Failed { message, .. } => {
            tracing::warn!(check = %check.kind(), elapsed_ms, error = %message, "check failed");
        }
    }

    Section {
        index,
        check: check.kind(),
        title: check.title().to_string(),
        lines: transcript.into_lines(),
        outcome,
        elapsed_ms,
    }
}

fn failure(check: &dyn Check, err: &ProbeError, transcript: &mut Transcript) -> Outcome {
    let message = err.to_string();
    transcript.fail(format!("{} failed: {message}", check.label()));
    Outcome::Failed {
        message,
        hint: err.hint().map(str::to_string),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::Line;

    struct Scripted {
        kind: CheckKind,
        fail_with: Option<&'static str>,
    }

    #[async_trait]
    impl Check for Scripted {
        fn kind(&self) -> CheckKind {
            self.kind
        }

        fn title(&self) -> &'static str {
            "Testing scripted behaviour"
        }

        fn label(&self) -> &'static str {
            "Scripted step"
        }

        async fn run(&self, _ctx: &ProbeContext, out: &mut Transcript) -> Result<()> {
            out.detail("starting");
            match self.fail_with {
                Some(msg) => Err(ProbeError::UnexpectedResult(msg.into())),
                None => {
                    out.pass("Scripted step successful!");
                    Ok(())
                }
            }
        }
    }

    fn scripted(kind: CheckKind, fail_with: Option<&'static str>) -> Box<dyn Check> {
        Box::new(Scripted { kind, fail_with })
    }

    fn context() -> ProbeContext {
        ProbeContext::new(ProbeConfig::default())
    }

    #[test]
    fn test_check_kind_parsing() {
        assert_eq!("basic".parse::<CheckKind>().unwrap(), CheckKind::Basic);
        assert_eq!(" Pool ".parse::<CheckKind>().unwrap(), CheckKind::Pool);
        assert_eq!(
            "prepared".parse::<CheckKind>().unwrap(),
            CheckKind::Prepared
        );

        let err = "transactions".parse::<CheckKind>().unwrap_err();
        assert!(err.to_string().contains("transactions"));
    }

    #[test]
    fn test_check_kind_display_round_trip() {
        for kind in CheckKind::ALL {
            assert_eq!(kind.to_string().parse::<CheckKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_standard_runner_order() {
        assert_eq!(Runner::standard().kinds(), CheckKind::ALL.to_vec());
    }

    #[test]
    fn test_select_only_and_skip() {
        let runner = Runner::standard().select(&[CheckKind::Pool, CheckKind::Basic], &[]);
        assert_eq!(runner.kinds(), vec![CheckKind::Basic, CheckKind::Pool]);

        let runner = Runner::standard().select(&[], &[CheckKind::Queries, CheckKind::Prepared]);
        assert_eq!(
            runner.kinds(),
            vec![
                CheckKind::Basic,
                CheckKind::Properties,
                CheckKind::Pool,
                CheckKind::Operations
            ]
        );

        let runner = Runner::standard().select(&[CheckKind::Pool], &[CheckKind::Pool]);
        assert!(runner.kinds().is_empty());
    }

    #[test]
    fn test_failure_does_not_stop_the_run() {
        let runner = Runner::new(vec![
            scripted(CheckKind::Basic, None),
            scripted(CheckKind::Properties, Some("no rows")),
            scripted(CheckKind::Pool, None),
        ]);

        let mut seen = Vec::new();
        let report = tokio_test::block_on(runner.run(&context(), |s| seen.push(s.index)));

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);

        let failed = &report.sections[1];
        assert_eq!(failed.check, CheckKind::Properties);
        assert_eq!(
            failed.lines.last().unwrap(),
            &Line::Fail {
                text: "Scripted step failed: unexpected result: no rows".into()
            }
        );
        assert!(matches!(
            &failed.outcome,
            Outcome::Failed { message, hint: None } if message == "unexpected result: no rows"
        ));
    }

    #[test]
    fn test_transcript_lines_are_kept_in_order() {
        let runner = Runner::new(vec![scripted(CheckKind::Basic, None)]);
        let report = tokio_test::block_on(runner.run(&context(), |_| {}));

        let section = &report.sections[0];
        assert_eq!(section.title, "Testing scripted behaviour");
        assert_eq!(
            section.lines,
            vec![
                Line::Detail {
                    indent: 1,
                    text: "starting".into()
                },
                Line::Pass {
                    text: "Scripted step successful!".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_runner_reports_success() {
        let report = Runner::new(Vec::new()).run(&context(), |_| {}).await;
        assert!(report.sections.is_empty());
        assert!(report.is_success());
        assert_eq!(report.title, REPORT_TITLE);
    }
}
