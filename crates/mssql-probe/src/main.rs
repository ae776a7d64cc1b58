//! `mssql-probe` command line.
//!
//! ```bash
//! export MSSQL_HOST=localhost
//! export MSSQL_PASSWORD=YourStrong@Passw0rd
//!
//! mssql-probe setup
//! mssql-probe run --skip pool
//! mssql-probe run --only basic,properties --format json
//! ```

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use mssql_probe::{
    CheckKind, ProbeConfig, ProbeContext, REPORT_TITLE, Report, Runner,
    checks, sample,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mssql-probe", version, about = "SQL Server connectivity diagnostics")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Overrides for the `MSSQL_*` environment variables.
#[derive(Args)]
struct ConnectionArgs {
    /// Server host (overrides MSSQL_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port (overrides MSSQL_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Database holding the sample schema (overrides MSSQL_DATABASE)
    #[arg(long, global = true)]
    database: Option<String>,

    /// SQL login (overrides MSSQL_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// SQL login password (overrides MSSQL_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Require TLS; `--encrypt false` turns it off (overrides MSSQL_ENCRYPT)
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    encrypt: Option<bool>,

    /// Complete connection string; wins over every discrete setting
    /// (overrides MSSQL_CONNECTION_STRING)
    #[arg(long, global = true)]
    connection_string: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the connectivity checks (default)
    Run(RunArgs),
    /// Create the database and install the sample schema
    Setup,
    /// Remove the sample schema
    Teardown,
    /// List the available checks
    Checks,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Run only these checks
    #[arg(long, value_delimiter = ',')]
    only: Vec<CheckKind>,

    /// Skip these checks
    #[arg(long, value_delimiter = ',')]
    skip: Vec<CheckKind>,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Maximum pool size
    #[arg(long)]
    pool_max_size: Option<u32>,

    /// Connections the pool keeps open while idle
    #[arg(long)]
    pool_min_idle: Option<u32>,

    /// Seconds to wait for a pooled connection
    #[arg(long)]
    pool_connection_timeout: Option<u64>,

    /// Seconds a pooled connection may stay idle
    #[arg(long)]
    pool_idle_timeout: Option<u64>,

    /// Maximum lifetime of a pooled connection in seconds
    #[arg(long)]
    pool_max_lifetime: Option<u64>,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or_else(|| Command::Run(RunArgs::default()));
    if let Command::Checks = command {
        list_checks();
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = probe_config(cli.connection)?;

    match command {
        Command::Run(args) => {
            args.apply_pool_overrides(&mut config);
            run(ProbeContext::new(config), &args).await
        }
        Command::Setup => {
            let ctx = ProbeContext::new(config);
            let steps = sample::install(&ctx)
                .await
                .context("failed to install the sample schema")?;
            for step in steps {
                println!("✓ {step}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Teardown => {
            let ctx = ProbeContext::new(config);
            let steps = sample::remove(&ctx)
                .await
                .context("failed to remove the sample schema")?;
            for step in steps {
                println!("✓ dropped {step}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Checks => Ok(ExitCode::SUCCESS),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn probe_config(args: ConnectionArgs) -> Result<ProbeConfig> {
    let mut config = ProbeConfig::from_env().context("invalid MSSQL_* environment")?;
    let settings = &mut config.connection;

    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(database) = args.database {
        settings.database = database;
    }
    if let Some(user) = args.user {
        settings.user = user;
    }
    if let Some(password) = args.password {
        settings.password = password;
    }
    if let Some(encrypt) = args.encrypt {
        settings.encrypt = encrypt;
    }

    Ok(match args.connection_string {
        Some(conn_str) => config.with_connection_string(conn_str),
        None => config,
    })
}

impl RunArgs {
    fn apply_pool_overrides(&self, config: &mut ProbeConfig) {
        let pool = &mut config.pool;
        if let Some(max_size) = self.pool_max_size {
            pool.max_size = max_size;
        }
        if let Some(min_idle) = self.pool_min_idle {
            pool.min_idle = min_idle;
        }
        if let Some(secs) = self.pool_connection_timeout {
            pool.connection_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.pool_idle_timeout {
            pool.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.pool_max_lifetime {
            pool.max_lifetime = Duration::from_secs(secs);
        }
    }
}

async fn run(ctx: ProbeContext, args: &RunArgs) -> Result<ExitCode> {
    let runner = Runner::standard().select(&args.only, &args.skip);
    let stdout = std::io::stdout();

    let report = match args.format {
        Format::Text => {
            Report::new(REPORT_TITLE).write_header(&mut stdout.lock())?;

            let mut write_error = None;
            let report = runner
                .run(&ctx, |section| {
                    let mut out = stdout.lock();
                    if let Err(e) = section.write_text(&mut out).and_then(|()| out.flush()) {
                        write_error.get_or_insert(e);
                    }
                })
                .await;
            if let Some(e) = write_error {
                return Err(e).context("failed to write report");
            }

            report.write_footer(&mut stdout.lock())?;
            report
        }
        Format::Json => {
            let report = runner.run(&ctx, |_| {}).await;
            report.write_json(&mut stdout.lock())?;
            report
        }
    };

    Ok(ExitCode::from(report.exit_status()))
}

fn list_checks() {
    for check in checks::all() {
        println!("{:<12} {}", check.kind(), check.title());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mssql-probe").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_encrypt_is_a_plain_flag() {
        assert_eq!(parse(&["--encrypt"]).connection.encrypt, Some(true));
        assert_eq!(parse(&["--encrypt", "false"]).connection.encrypt, Some(false));
        assert_eq!(parse(&[]).connection.encrypt, None);
    }

    #[test]
    fn test_encrypt_flag_after_subcommand() {
        let cli = parse(&["run", "--encrypt", "--only", "basic"]);
        assert_eq!(cli.connection.encrypt, Some(true));
        match cli.command {
            Some(Command::Run(args)) => assert_eq!(args.only, vec![CheckKind::Basic]),
            _ => panic!("expected the run subcommand"),
        }
    }

    #[test]
    fn test_unknown_check_name_is_rejected() {
        let err = Cli::try_parse_from(["mssql-probe", "run", "--skip", "transactions"]);
        assert!(err.is_err());
    }
}
