//! Testing errors.

use thiserror::Error;

/// Errors raised while preparing a test server.
#[derive(Debug, Error)]
pub enum TestingError {
    /// Docker or the container runtime failed.
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    /// The probe failed against the container.
    #[error("probe error: {0}")]
    Probe(#[from] mssql_probe::ProbeError),
}

/// Result type for test server setup.
pub type Result<T> = std::result::Result<T, TestingError>;
