//! Built-in connectivity checks.

mod basic;
mod operations;
mod pool;
mod prepared;
mod properties;
mod queries;

use mssql_client::Row;

use crate::check::Check;
use crate::error::{ProbeError, Result};

pub use basic::{BasicConnection, product_name};
pub use operations::{
    DatabaseOperations, TEST_EMPLOYEE_EMAIL, TEST_EMPLOYEE_SALARY, TEST_EMPLOYEE_TITLE,
};
pub use pool::ConnectionPool;
pub use prepared::PreparedStatements;
pub use properties::ConnectionProperties;
pub use queries::QueryMapping;

/// Every built-in check in run order.
#[must_use]
pub fn all() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(BasicConnection),
        Box::new(ConnectionProperties),
        Box::new(ConnectionPool),
        Box::new(DatabaseOperations),
        Box::new(QueryMapping),
        Box::new(PreparedStatements),
    ]
}

/// Take the single row a query is expected to produce.
fn single_row<I>(rows: I, what: &str) -> Result<Row>
where
    I: IntoIterator<Item = std::result::Result<Row, mssql_client::Error>>,
{
    rows.into_iter()
        .next()
        .transpose()?
        .ok_or_else(|| ProbeError::UnexpectedResult(format!("{what} returned no rows")))
}
