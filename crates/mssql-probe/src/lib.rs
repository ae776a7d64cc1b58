//! # mssql-probe
//!
//! Connectivity diagnostics for SQL Server built on `mssql-client` and
//! `mssql-driver-pool`.
//!
//! The probe runs a fixed sequence of checks and prints a pass/fail line for
//! each step:
//!
//! - **basic**: raw connection and server metadata
//! - **properties**: connection with explicit timeouts and a trivial query
//! - **pool**: repeated checkouts from a connection pool, with statistics
//! - **operations**: select, insert/cleanup, stored procedure and function
//! - **queries**: typed mapping of the sample tables
//! - **prepared**: parameterized filtering
//!
//! A failing check is reported and the run moves on to the next one.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_probe::{ConnectionSettings, ProbeConfig, ProbeContext, Runner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProbeConfig::new(ConnectionSettings::from_env()?);
//!     let ctx = ProbeContext::new(config);
//!
//!     let report = Runner::standard().run(&ctx, |_| {}).await;
//!     report.write_text(&mut std::io::stdout())?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod check;
pub mod checks;
pub mod config;
pub mod error;
pub mod report;
pub mod sample;

// Re-export commonly used types
pub use check::{Check, CheckKind, ProbeContext, REPORT_TITLE, Runner, UnknownCheck};
pub use config::{ConnectionSettings, PoolSettings, ProbeConfig, TunedSettings};
pub use error::{ProbeError, Result};
pub use report::{Line, Outcome, Report, Section, Transcript};
