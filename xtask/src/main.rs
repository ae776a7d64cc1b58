//! Build automation tasks for the mssql-probe workspace.
//!
//! Run with `cargo xtask <command>`.
//!
//! ## Available Commands
//!
//! - `ci`: Run all CI checks (format, lint, test, deny)
//! - `fmt`: Check/apply code formatting
//! - `clippy`: Run clippy lints
//! - `test`: Run tests, optionally including the live and container suites
//! - `deny`: Run cargo-deny checks
//! - `doc`: Generate documentation
//! - `coverage`: Run code coverage
//! - `clean`: Clean build artifacts
//! - `db`: Manage a local SQL Server container for live runs

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

const DB_CONTAINER: &str = "mssql-probe-db";
const DB_IMAGE: &str = "mcr.microsoft.com/mssql/server";

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for mssql-probe")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all checks (format, lint, test, deny)
    Ci,
    /// Run cargo fmt (--check by default, --fix to apply)
    Fmt {
        /// Apply formatting fixes
        #[arg(long)]
        fix: bool,
    },
    /// Run clippy with all features
    Clippy {
        /// Apply clippy suggestions
        #[arg(long)]
        fix: bool,
    },
    /// Run all tests
    Test {
        /// Test a specific package
        #[arg(short, long)]
        package: Option<String>,
        /// Also run the live tests (needs MSSQL_* pointing at a server)
        #[arg(long)]
        live: bool,
        /// Also run the container tests (needs Docker)
        #[arg(long)]
        containers: bool,
    },
    /// Run cargo-deny checks
    Deny,
    /// Generate documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Run code coverage
    Coverage {
        /// Output format (html, lcov, json)
        #[arg(long, default_value = "html")]
        format: String,
    },
    /// Clean build artifacts
    Clean,
    /// Manage the local SQL Server container
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Start SQL Server in Docker
    Up {
        /// Image tag
        #[arg(long, default_value = "2022-latest")]
        tag: String,
        /// SA password
        #[arg(long, default_value = "Password123!")]
        password: String,
        /// Host port to publish
        #[arg(long, default_value = "1433")]
        port: u16,
    },
    /// Stop and remove the container
    Down,
    /// Install the sample schema into the running server
    Setup,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // Change to workspace root
    let workspace_root = workspace_root()?;
    sh.change_dir(&workspace_root);

    match cli.command {
        Command::Ci => {
            println!("Running CI checks...");
            fmt(&sh, false)?;
            clippy(&sh, false)?;
            test(&sh, None, false, false)?;
            deny(&sh)?;
            println!("\n✅ All CI checks passed!");
        }
        Command::Fmt { fix } => fmt(&sh, fix)?,
        Command::Clippy { fix } => clippy(&sh, fix)?,
        Command::Test {
            package,
            live,
            containers,
        } => test(&sh, package.as_deref(), live, containers)?,
        Command::Deny => deny(&sh)?,
        Command::Doc { open } => doc(&sh, open)?,
        Command::Coverage { format } => coverage(&sh, &format)?,
        Command::Clean => clean(&sh)?,
        Command::Db { action } => db(&sh, action)?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let path = String::from_utf8(output.stdout)
        .context("invalid UTF-8 in cargo output")?
        .trim()
        .to_string();

    Ok(PathBuf::from(path)
        .parent()
        .context("failed to get workspace root")?
        .to_path_buf())
}

fn fmt(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        println!("Applying formatting...");
        cmd!(sh, "cargo fmt --all").run()?;
        println!("✅ Formatting applied.");
    } else {
        println!("Checking formatting...");
        cmd!(sh, "cargo fmt --all -- --check").run()?;
        println!("✅ Formatting check passed.");
    }
    Ok(())
}

fn clippy(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        println!("Applying clippy suggestions...");
        cmd!(
            sh,
            "cargo clippy --all-features --all-targets --fix --allow-dirty"
        )
        .run()?;
        println!("✅ Clippy suggestions applied.");
    } else {
        println!("Running clippy...");
        cmd!(
            sh,
            "cargo clippy --all-features --all-targets -- -D warnings"
        )
        .run()?;
        println!("✅ Clippy check passed.");
    }
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>, live: bool, containers: bool) -> Result<()> {
    println!("Running tests...");

    let mut args = vec!["test"];
    match package {
        Some(pkg) => args.extend(["-p", pkg]),
        None => args.push("--workspace"),
    }
    args.push("--all-features");
    cmd!(sh, "cargo {args...}").run()?;

    if live {
        println!("Running live tests against $MSSQL_HOST...");
        cmd!(
            sh,
            "cargo test -p mssql-probe --test live -- --ignored --test-threads=1"
        )
        .run()?;
    }

    if containers {
        println!("Running container tests...");
        cmd!(
            sh,
            "cargo test -p mssql-probe-testing --test container -- --ignored"
        )
        .run()?;
    }

    println!("✅ All tests passed.");
    Ok(())
}

fn deny(sh: &Shell) -> Result<()> {
    println!("Running cargo-deny...");
    cmd!(sh, "cargo deny check").run()?;
    println!("✅ Cargo-deny check passed.");
    Ok(())
}

fn doc(sh: &Shell, open: bool) -> Result<()> {
    println!("Generating documentation...");
    if open {
        cmd!(sh, "cargo doc --all-features --no-deps --open").run()?;
    } else {
        cmd!(sh, "cargo doc --all-features --no-deps").run()?;
    }
    println!("✅ Documentation generated.");
    Ok(())
}

fn coverage(sh: &Shell, format: &str) -> Result<()> {
    println!("Running code coverage...");

    // Requires cargo-llvm-cov
    match format {
        "html" => {
            cmd!(sh, "cargo llvm-cov --all-features --html").run()?;
            println!("✅ Coverage report: target/llvm-cov/html/index.html");
        }
        "lcov" => {
            cmd!(
                sh,
                "cargo llvm-cov --all-features --lcov --output-path target/lcov.info"
            )
            .run()?;
            println!("✅ Coverage report: target/lcov.info");
        }
        _ => {
            bail!("Unknown coverage format: {format}. Use html or lcov.");
        }
    }

    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("Cleaning build artifacts...");
    cmd!(sh, "cargo clean").run()?;
    println!("✅ Clean complete.");
    Ok(())
}

fn db(sh: &Shell, action: DbAction) -> Result<()> {
    match action {
        DbAction::Up {
            tag,
            password,
            port,
        } => {
            println!("Starting {DB_IMAGE}:{tag} as {DB_CONTAINER}...");
            let image = format!("{DB_IMAGE}:{tag}");
            let sa_password = format!("MSSQL_SA_PASSWORD={password}");
            let publish = format!("{port}:1433");
            cmd!(
                sh,
                "docker run -d --name {DB_CONTAINER} -e ACCEPT_EULA=Y -e {sa_password} -p {publish} {image}"
            )
            .run()?;
            println!("✅ SQL Server starting on localhost:{port}.");
            println!("   export MSSQL_HOST=localhost MSSQL_PORT={port} MSSQL_PASSWORD='{password}'");
        }
        DbAction::Down => {
            println!("Removing {DB_CONTAINER}...");
            cmd!(sh, "docker rm -f {DB_CONTAINER}").run()?;
            println!("✅ Container removed.");
        }
        DbAction::Setup => {
            println!("Installing sample schema...");
            cmd!(sh, "cargo run -p mssql-probe -- setup").run()?;
            println!("✅ Sample schema installed.");
        }
    }
    Ok(())
}
