//! Typed mapping of the sample tables.

use async_trait::async_trait;
use mssql_client::RowIteratorExt;

use crate::check::{Check, CheckKind, ProbeContext};
use crate::error::Result;
use crate::report::Transcript;
use crate::sample::{Department, Employee};

const DEPARTMENTS_SQL: &str =
    "SELECT dept_id, dept_name, location, manager_id FROM dbo.departments ORDER BY dept_id";

const EMPLOYEES_SQL: &str = "SELECT TOP (5) emp_id, first_name, last_name, email, job_title, \
     salary, dept_id, hire_date, status FROM dbo.employees ORDER BY emp_id";

/// Maps departments and employees into typed rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryMapping;

#[async_trait]
impl Check for QueryMapping {
    fn kind(&self) -> CheckKind {
        CheckKind::Queries
    }

    fn title(&self) -> &'static str {
        "Testing query operations"
    }

    fn label(&self) -> &'static str {
        "Query operations"
    }

    async fn run(&self, ctx: &ProbeContext, out: &mut Transcript) -> Result<()> {
        let mut client = ctx.connect().await?;

        out.detail("Querying departments...");
        let departments: Vec<Department> = client
            .query(DEPARTMENTS_SQL, &[])
            .await?
            .map_rows::<Department>()
            .collect::<std::result::Result<_, _>>()?;
        for department in &departments {
            out.nested(department.to_string());
        }

        out.detail("Querying employees...");
        let employees: Vec<Employee> = client
            .query(EMPLOYEES_SQL, &[])
            .await?
            .map_rows::<Employee>()
            .collect::<std::result::Result<_, _>>()?;
        for employee in &employees {
            out.nested(employee.to_string());
        }

        client.close().await?;
        out.pass("Query operations successful!");
        Ok(())
    }
}
