//! # mssql-probe-testing
//!
//! Disposable SQL Server instances for exercising `mssql-probe` end to end.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_probe::Runner;
//! use mssql_probe_testing::{ProbeServer, SqlServerImage};
//!
//! #[tokio::test]
//! async fn test_probe_against_container() {
//!     let server = ProbeServer::start(SqlServerImage::default(), "app_schema")
//!         .await
//!         .unwrap();
//!     server.install_sample().await.unwrap();
//!
//!     let report = Runner::standard().run(&server.context(), |_| {}).await;
//!     assert!(report.is_success());
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod error;

pub use container::{ProbeServer, SQL_SERVER_PORT, SqlServerImage};
pub use error::{Result, TestingError};
