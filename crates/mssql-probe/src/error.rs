//! Probe error types.

use thiserror::Error;

/// SQL Server error number for a failed login.
pub const LOGIN_FAILED: i32 = 18456;
/// SQL Server error number for a database that cannot be opened.
pub const CANNOT_OPEN_DATABASE: i32 = 4060;
/// SQL Server error number for an unknown table or view.
pub const INVALID_OBJECT_NAME: i32 = 208;
/// SQL Server error number for an unknown stored procedure.
pub const UNKNOWN_PROCEDURE: i32 = 2812;
/// SQL Server error number for an unknown scalar function.
pub const UNKNOWN_FUNCTION: i32 = 4121;

/// Errors that can occur while probing a server.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The driver reported an error.
    #[error("{0}")]
    Client(#[from] mssql_client::Error),

    /// The connection pool reported an error.
    #[error("{0}")]
    Pool(#[from] mssql_driver_pool::PoolError),

    /// Invalid probe configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An identifier that cannot be safely bracket-quoted.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The server answered, but not with what the probe expected.
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),
}

impl ProbeError {
    /// Operator hint for well-known failures.
    ///
    /// Returns `None` when there is nothing more useful to say than the
    /// error message itself.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Client(mssql_client::Error::Server { number, .. }) => server_error_hint(*number),
            Self::Client(e) if e.is_transient() => {
                Some("server unreachable or not responding; check host, port and firewall")
            }
            Self::Pool(mssql_driver_pool::PoolError::AcquisitionTimeout(_)) => {
                Some("no pooled connection became available; check the pool size and server load")
            }
            _ => None,
        }
    }
}

/// Hint for a SQL Server error number.
#[must_use]
pub fn server_error_hint(number: i32) -> Option<&'static str> {
    match number {
        LOGIN_FAILED => Some("login failed; check MSSQL_USER and MSSQL_PASSWORD"),
        CANNOT_OPEN_DATABASE => {
            Some("database does not exist or is not accessible; run `mssql-probe setup`")
        }
        INVALID_OBJECT_NAME | UNKNOWN_PROCEDURE | UNKNOWN_FUNCTION => {
            Some("sample schema is missing; run `mssql-probe setup`")
        }
        _ => None,
    }
}

/// Result type for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_for_missing_schema_objects() {
        for number in [INVALID_OBJECT_NAME, UNKNOWN_PROCEDURE, UNKNOWN_FUNCTION] {
            let hint = server_error_hint(number);
            assert!(hint.is_some_and(|h| h.contains("mssql-probe setup")));
        }
    }

    #[test]
    fn test_hint_for_login_failure() {
        assert!(server_error_hint(LOGIN_FAILED).is_some_and(|h| h.contains("MSSQL_PASSWORD")));
    }

    #[test]
    fn test_no_hint_for_ordinary_errors() {
        assert!(server_error_hint(102).is_none());
        assert!(ProbeError::Config("bad port".into()).hint().is_none());
        assert!(
            ProbeError::Client(mssql_client::Error::Query("boom".into()))
                .hint()
                .is_none()
        );
    }

    #[test]
    fn test_pool_timeout_hint() {
        let err = ProbeError::Pool(mssql_driver_pool::PoolError::AcquisitionTimeout(
            std::time::Duration::from_secs(30),
        ));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_config_error_message() {
        let err = ProbeError::Config("invalid port: abc".into());
        assert_eq!(err.to_string(), "configuration error: invalid port: abc");
    }
}
