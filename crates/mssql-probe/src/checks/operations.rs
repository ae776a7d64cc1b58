//! Representative data operations against the sample schema.
//!
//! The steps share one connection and run in order; the first failing step
//! ends the check.

use async_trait::async_trait;
use mssql_client::{Client, Error, Ready};
use rust_decimal::Decimal;

use super::single_row;
use crate::check::{Check, CheckKind, ProbeContext};
use crate::error::{ProbeError, Result};
use crate::report::Transcript;
use crate::sample::{IT_DEPARTMENT_ID, money};

/// E-mail of the employee row inserted and removed by the INSERT step.
pub const TEST_EMPLOYEE_EMAIL: &str = "test.user@company.com";
/// Job title of the test employee.
pub const TEST_EMPLOYEE_TITLE: &str = "Software Tester";
/// Salary of the test employee.
pub const TEST_EMPLOYEE_SALARY: i64 = 65_000;

const DEPARTMENTS_SQL: &str =
    "SELECT dept_id, dept_name, location FROM dbo.departments ORDER BY dept_id";

const HEADCOUNT_SQL: &str = "SELECT d.dept_name, COUNT(e.emp_id) AS emp_count \
     FROM dbo.departments d LEFT JOIN dbo.employees e ON d.dept_id = e.dept_id \
     GROUP BY d.dept_name ORDER BY emp_count DESC, d.dept_name";

const INSERT_SQL: &str = "INSERT INTO dbo.employees \
     (first_name, last_name, email, job_title, salary, dept_id, hire_date) \
     VALUES (@p1, @p2, @p3, @p4, @p5, @p6, CAST(GETDATE() AS DATE))";

const DELETE_SQL: &str = "DELETE FROM dbo.employees WHERE email = @p1";

const PROCEDURE_SQL: &str = "DECLARE @count INT; \
     EXEC dbo.get_employee_count @p_dept_id = @p1, @p_count = @count OUTPUT; \
     SELECT @count AS emp_count";

const FUNCTION_SQL: &str = "SELECT dbo.get_department_budget(@p1) AS budget";

/// Select, insert/cleanup, stored procedure and scalar function calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseOperations;

#[async_trait]
impl Check for DatabaseOperations {
    fn kind(&self) -> CheckKind {
        CheckKind::Operations
    }

    fn title(&self) -> &'static str {
        "Testing database operations"
    }

    fn label(&self) -> &'static str {
        "Database operations test"
    }

    async fn run(&self, ctx: &ProbeContext, out: &mut Transcript) -> Result<()> {
        let mut client = ctx.connect().await?;

        out.detail("Testing SELECT operations...");
        select_operations(&mut client, out).await?;

        out.detail("Testing INSERT operation...");
        insert_operation(&mut client, out).await?;

        out.detail("Testing stored procedure call...");
        procedure_call(&mut client, out).await?;

        out.detail("Testing function call...");
        function_call(&mut client, out).await?;

        client.close().await?;
        out.pass("Database operations successful!");
        Ok(())
    }
}

async fn select_operations(client: &mut Client<Ready>, out: &mut Transcript) -> Result<()> {
    out.nested("Departments:");
    for result in client.query(DEPARTMENTS_SQL, &[]).await? {
        let row = result?;
        let id: i32 = row.get_by_name("dept_id").map_err(Error::from)?;
        let name: String = row.get_by_name("dept_name").map_err(Error::from)?;
        let location: Option<String> = row.get_by_name("location").map_err(Error::from)?;
        out.indented(
            3,
            format!("{id}: {name} ({})", location.as_deref().unwrap_or("no location")),
        );
    }

    out.nested("Employee count by department:");
    for result in client.query(HEADCOUNT_SQL, &[]).await? {
        let row = result?;
        let name: String = row.get_by_name("dept_name").map_err(Error::from)?;
        let count: i32 = row.get_by_name("emp_count").map_err(Error::from)?;
        out.indented(3, format!("{name}: {count} employees"));
    }
    Ok(())
}

async fn insert_operation(client: &mut Client<Ready>, out: &mut Transcript) -> Result<()> {
    let stale = client.execute(DELETE_SQL, &[&TEST_EMPLOYEE_EMAIL]).await?;
    if stale > 0 {
        tracing::warn!(rows = stale, "removed test employee left over from an earlier run");
    }

    let salary = Decimal::from(TEST_EMPLOYEE_SALARY);
    let inserted = client
        .execute(
            INSERT_SQL,
            &[
                &"Test",
                &"User",
                &TEST_EMPLOYEE_EMAIL,
                &TEST_EMPLOYEE_TITLE,
                &salary,
                &IT_DEPARTMENT_ID,
            ],
        )
        .await?;
    out.nested(format!("Inserted {inserted} test employee record"));

    let deleted = client.execute(DELETE_SQL, &[&TEST_EMPLOYEE_EMAIL]).await?;
    confirm_cleanup(inserted, deleted)?;
    out.nested("Cleaned up test record");
    Ok(())
}

fn confirm_cleanup(inserted: u64, deleted: u64) -> Result<()> {
    if deleted == inserted {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedResult(format!(
            "cleanup removed {deleted} test employee rows, expected {inserted}"
        )))
    }
}

async fn procedure_call(client: &mut Client<Ready>, out: &mut Transcript) -> Result<()> {
    let rows = client.query(PROCEDURE_SQL, &[&IT_DEPARTMENT_ID]).await?;
    let row = single_row(rows, "get_employee_count")?;
    let count: i32 = row.get_by_name("emp_count").map_err(Error::from)?;
    out.nested(format!("IT department has {count} employees"));
    Ok(())
}

async fn function_call(client: &mut Client<Ready>, out: &mut Transcript) -> Result<()> {
    let rows = client.query(FUNCTION_SQL, &[&IT_DEPARTMENT_ID]).await?;
    let row = single_row(rows, "get_department_budget")?;
    // NULL only when the function has no row to sum over
    let budget: Option<Decimal> = row.get_by_name("budget").map_err(Error::from)?;
    out.nested(format!(
        "IT department total budget: {}",
        money(budget.unwrap_or_default())
    ));
    Ok(())
}
