//! Parameterized filtering.

use async_trait::async_trait;
use mssql_client::Error;
use rust_decimal::Decimal;

use crate::check::{Check, CheckKind, ProbeContext};
use crate::error::Result;
use crate::report::Transcript;
use crate::sample::{IT_DEPARTMENT_ID, money};

const SALARY_THRESHOLD: i64 = 70_000;

const FILTER_SQL: &str = "SELECT emp_id, first_name, last_name, salary FROM dbo.employees \
     WHERE dept_id = @p1 AND salary > @p2 ORDER BY emp_id";

/// Runs the same parameterized statement shape the driver caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreparedStatements;

#[async_trait]
impl Check for PreparedStatements {
    fn kind(&self) -> CheckKind {
        CheckKind::Prepared
    }

    fn title(&self) -> &'static str {
        "Testing prepared statements"
    }

    fn label(&self) -> &'static str {
        "Prepared statements"
    }

    async fn run(&self, ctx: &ProbeContext, out: &mut Transcript) -> Result<()> {
        let mut client = ctx.connect().await?;
        let threshold = Decimal::from(SALARY_THRESHOLD);

        out.detail("IT employees with salary > $70,000:");
        let rows = client
            .query(FILTER_SQL, &[&IT_DEPARTMENT_ID, &threshold])
            .await?;
        for result in rows {
            let row = result?;
            let id: i32 = row.get_by_name("emp_id").map_err(Error::from)?;
            let first: String = row.get_by_name("first_name").map_err(Error::from)?;
            let last: String = row.get_by_name("last_name").map_err(Error::from)?;
            let salary: Decimal = row.get_by_name("salary").map_err(Error::from)?;
            out.nested(format!("{id}: {first} {last} - {}", money(salary)));
        }

        client.close().await?;
        out.pass("Prepared statements successful!");
        Ok(())
    }
}
