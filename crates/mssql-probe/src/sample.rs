//! Sample HR schema the data checks run against.
//!
//! Two tables (`departments`, `employees`), a stored procedure with an
//! output parameter and a scalar function. Department 1 is always IT.

use std::fmt;

use chrono::NaiveDate;
use mssql_client::{Error, FromRow, Row};
use rust_decimal::Decimal;

use crate::check::ProbeContext;
use crate::error::{ProbeError, Result};

/// Department every data check targets.
pub const IT_DEPARTMENT_ID: i32 = 1;

/// Maximum length of a SQL Server identifier.
const MAX_IDENTIFIER_LEN: usize = 128;

/// A row of `dbo.departments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    /// Department id.
    pub id: i32,
    /// Department name.
    pub name: String,
    /// Office location.
    pub location: Option<String>,
    /// Employee id of the manager, if any.
    pub manager_id: Option<i32>,
}

impl FromRow for Department {
    fn from_row(row: &Row) -> std::result::Result<Self, Error> {
        Ok(Self {
            id: row.get_by_name("dept_id").map_err(Error::from)?,
            name: row.get_by_name("dept_name").map_err(Error::from)?,
            location: row.get_by_name("location").map_err(Error::from)?,
            manager_id: row.get_by_name("manager_id").map_err(Error::from)?,
        })
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.id,
            self.name,
            self.location.as_deref().unwrap_or("no location")
        )?;
        match self.manager_id {
            Some(id) => write!(f, " - Manager ID: {id}"),
            None => f.write_str(" - No manager"),
        }
    }
}

/// A row of `dbo.employees`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    /// Employee id.
    pub id: i32,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique e-mail address.
    pub email: String,
    /// Job title.
    pub job_title: String,
    /// Annual salary.
    pub salary: Decimal,
    /// Department id.
    pub dept_id: i32,
    /// Hire date.
    pub hire_date: NaiveDate,
    /// Employment status, e.g. `ACTIVE`.
    pub status: String,
}

impl FromRow for Employee {
    fn from_row(row: &Row) -> std::result::Result<Self, Error> {
        Ok(Self {
            id: row.get_by_name("emp_id").map_err(Error::from)?,
            first_name: row.get_by_name("first_name").map_err(Error::from)?,
            last_name: row.get_by_name("last_name").map_err(Error::from)?,
            email: row.get_by_name("email").map_err(Error::from)?,
            job_title: row.get_by_name("job_title").map_err(Error::from)?,
            salary: row.get_by_name("salary").map_err(Error::from)?,
            dept_id: row.get_by_name("dept_id").map_err(Error::from)?,
            hire_date: row.get_by_name("hire_date").map_err(Error::from)?,
            status: row.get_by_name("status").map_err(Error::from)?,
        })
    }
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} ({}) - {}",
            self.id,
            self.first_name,
            self.last_name,
            self.job_title,
            money(self.salary)
        )
    }
}

/// Format an amount as `$1234.50`.
#[must_use]
pub fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Batches creating the sample schema. Each batch is idempotent.
pub const SETUP: &[(&str, &str)] = &[
    (
        "table dbo.departments",
        "IF OBJECT_ID(N'dbo.departments', N'U') IS NULL
         CREATE TABLE dbo.departments (
             dept_id    INT           NOT NULL PRIMARY KEY,
             dept_name  NVARCHAR(100) NOT NULL UNIQUE,
             location   NVARCHAR(100) NULL,
             manager_id INT           NULL
         )",
    ),
    (
        "table dbo.employees",
        "IF OBJECT_ID(N'dbo.employees', N'U') IS NULL
         CREATE TABLE dbo.employees (
             emp_id     INT IDENTITY(1,1) NOT NULL PRIMARY KEY,
             first_name NVARCHAR(50)      NOT NULL,
             last_name  NVARCHAR(50)      NOT NULL,
             email      NVARCHAR(100)     NOT NULL UNIQUE,
             job_title  NVARCHAR(100)     NOT NULL,
             salary     DECIMAL(10,2)     NOT NULL,
             dept_id    INT               NOT NULL REFERENCES dbo.departments (dept_id),
             hire_date  DATE              NOT NULL DEFAULT CAST(GETDATE() AS DATE),
             status     NVARCHAR(20)      NOT NULL DEFAULT N'ACTIVE'
         )",
    ),
    (
        "seed departments",
        "IF NOT EXISTS (SELECT 1 FROM dbo.departments)
         INSERT INTO dbo.departments (dept_id, dept_name, location, manager_id) VALUES
             (1, N'IT',         N'New York',      1),
             (2, N'HR',         N'Chicago',       4),
             (3, N'Finance',    N'Boston',        6),
             (4, N'Marketing',  N'San Francisco', NULL)",
    ),
    (
        "seed employees",
        "IF NOT EXISTS (SELECT 1 FROM dbo.employees)
         INSERT INTO dbo.employees (first_name, last_name, email, job_title, salary, dept_id, hire_date) VALUES
             (N'John',    N'Smith',    N'john.smith@company.com',    N'IT Manager',        95000.00, 1, '2019-03-15'),
             (N'Sarah',   N'Johnson',  N'sarah.johnson@company.com', N'Senior Developer',  85000.00, 1, '2020-06-01'),
             (N'Michael', N'Brown',    N'michael.brown@company.com', N'Developer',         68000.00, 1, '2021-09-20'),
             (N'Emily',   N'Davis',    N'emily.davis@company.com',   N'HR Manager',        78000.00, 2, '2018-11-05'),
             (N'David',   N'Wilson',   N'david.wilson@company.com',  N'HR Specialist',     55000.00, 2, '2022-01-10'),
             (N'Lisa',    N'Anderson', N'lisa.anderson@company.com', N'Finance Manager',   92000.00, 3, '2017-04-12'),
             (N'James',   N'Taylor',   N'james.taylor@company.com',  N'Accountant',        62000.00, 3, '2021-02-28'),
             (N'Anna',    N'Martinez', N'anna.martinez@company.com', N'Marketing Analyst', 58000.00, 4, '2023-05-15')",
    ),
    (
        "procedure dbo.get_employee_count",
        "CREATE OR ALTER PROCEDURE dbo.get_employee_count
             @p_dept_id INT,
             @p_count   INT OUTPUT
         AS
         BEGIN
             SET NOCOUNT ON;
             SELECT @p_count = COUNT(*) FROM dbo.employees WHERE dept_id = @p_dept_id;
         END",
    ),
    (
        "function dbo.get_department_budget",
        "CREATE OR ALTER FUNCTION dbo.get_department_budget (@p_dept_id INT)
         RETURNS DECIMAL(12,2)
         AS
         BEGIN
             RETURN (SELECT COALESCE(SUM(salary), 0) FROM dbo.employees WHERE dept_id = @p_dept_id);
         END",
    ),
];

/// Batches removing the sample schema.
pub const TEARDOWN: &[(&str, &str)] = &[
    (
        "function dbo.get_department_budget",
        "DROP FUNCTION IF EXISTS dbo.get_department_budget",
    ),
    (
        "procedure dbo.get_employee_count",
        "DROP PROCEDURE IF EXISTS dbo.get_employee_count",
    ),
    ("table dbo.employees", "DROP TABLE IF EXISTS dbo.employees"),
    ("table dbo.departments", "DROP TABLE IF EXISTS dbo.departments"),
];

/// Check that `name` can be bracket-quoted as a database name.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(ProbeError::InvalidIdentifier(name.to_string()))
    }
}

/// SQL creating `database` unless it already exists.
pub fn create_database_sql(database: &str) -> Result<String> {
    validate_identifier(database)?;
    Ok(format!(
        "IF DB_ID(N'{database}') IS NULL CREATE DATABASE [{database}]"
    ))
}

/// Create the configured database if needed, then install the sample schema.
///
/// Returns the descriptions of the batches that ran.
pub async fn install(ctx: &ProbeContext) -> Result<Vec<&'static str>> {
    let database = ctx.config().database()?;
    let create = create_database_sql(&database)?;

    let mut master = ctx.connect_to("master").await?;
    tracing::info!(database = %database, "ensuring database exists");
    master.execute(&create, &[]).await?;
    master.close().await?;

    run_batches(ctx, SETUP).await
}

/// Remove the sample schema from the configured database.
pub async fn remove(ctx: &ProbeContext) -> Result<Vec<&'static str>> {
    run_batches(ctx, TEARDOWN).await
}

async fn run_batches(
    ctx: &ProbeContext,
    batches: &'static [(&'static str, &'static str)],
) -> Result<Vec<&'static str>> {
    let mut client = ctx.connect().await?;
    let mut done = Vec::with_capacity(batches.len());

    for (description, sql) in batches {
        tracing::info!(step = description, "running schema batch");
        client.execute(sql, &[]).await?;
        done.push(*description);
    }

    client.close().await?;
    Ok(done)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn employee() -> Employee {
        Employee {
            id: 2,
            first_name: "Sarah".into(),
            last_name: "Johnson".into(),
            email: "sarah.johnson@company.com".into(),
            job_title: "Senior Developer".into(),
            salary: Decimal::from_str("85000.5").unwrap(),
            dept_id: IT_DEPARTMENT_ID,
            hire_date: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            status: "ACTIVE".into(),
        }
    }

    #[test]
    fn test_department_display() {
        let mut dept = Department {
            id: 1,
            name: "IT".into(),
            location: Some("New York".into()),
            manager_id: Some(1),
        };
        assert_eq!(dept.to_string(), "1: IT (New York) - Manager ID: 1");

        dept.manager_id = None;
        dept.location = None;
        assert_eq!(dept.to_string(), "1: IT (no location) - No manager");
    }

    #[test]
    fn test_employee_display() {
        assert_eq!(
            employee().to_string(),
            "2: Sarah Johnson (Senior Developer) - $85000.50"
        );
    }

    #[test]
    fn test_money_rounds_to_cents() {
        assert_eq!(money(Decimal::from(65000)), "$65000.00");
        assert_eq!(money(Decimal::from_str("1234.567").unwrap()), "$1234.57");
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("app_schema").is_ok());
        assert!(validate_identifier("_tmp1").is_ok());

        for bad in ["", "1db", "app-schema", "x]; DROP TABLE t; --", "a b"] {
            assert!(
                matches!(validate_identifier(bad), Err(ProbeError::InvalidIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_identifier(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_create_database_sql() {
        assert_eq!(
            create_database_sql("app_schema").unwrap(),
            "IF DB_ID(N'app_schema') IS NULL CREATE DATABASE [app_schema]"
        );
        assert!(create_database_sql("bad]name").is_err());
    }

    #[test]
    fn test_setup_creates_every_object_the_checks_use() {
        let all: String = SETUP.iter().map(|(_, sql)| *sql).collect();
        for object in [
            "dbo.departments",
            "dbo.employees",
            "dbo.get_employee_count",
            "dbo.get_department_budget",
        ] {
            assert!(all.contains(object), "missing {object}");
        }
    }

    #[test]
    fn test_module_batches_stand_alone() {
        // CREATE PROCEDURE / FUNCTION must be the first statement of a batch.
        for (_, sql) in SETUP {
            let trimmed = sql.trim_start();
            if trimmed.contains("PROCEDURE") || trimmed.contains("FUNCTION") {
                assert!(trimmed.starts_with("CREATE OR ALTER"));
            }
        }
    }

    #[test]
    fn test_teardown_drops_dependents_first() {
        let order: Vec<&str> = TEARDOWN.iter().map(|(d, _)| *d).collect();
        let employees = order.iter().position(|d| d.ends_with("employees")).unwrap();
        let departments = order
            .iter()
            .position(|d| d.ends_with("departments"))
            .unwrap();
        assert!(employees < departments);
    }
}
