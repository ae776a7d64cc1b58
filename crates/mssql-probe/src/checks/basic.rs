//! Raw connection and server metadata.

use async_trait::async_trait;
use mssql_client::Error;

use super::single_row;
use crate::check::{Check, CheckKind, ProbeContext};
use crate::error::Result;
use crate::report::Transcript;

const DRIVER_NAME: &str = "mssql-client";

const METADATA_SQL: &str = "SELECT @@VERSION AS version, \
     CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS product_version, \
     CAST(SERVERPROPERTY('Edition') AS NVARCHAR(128)) AS edition, \
     SUSER_SNAME() AS login_name";

/// Connects with the base settings and prints server metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicConnection;

#[async_trait]
impl Check for BasicConnection {
    fn kind(&self) -> CheckKind {
        CheckKind::Basic
    }

    fn title(&self) -> &'static str {
        "Testing basic connection"
    }

    fn label(&self) -> &'static str {
        "Basic connection"
    }

    async fn run(&self, ctx: &ProbeContext, out: &mut Transcript) -> Result<()> {
        let mut client = ctx.connect().await?;
        out.pass("Basic connection successful!");

        let url = format!(
            "{}:{}/{}",
            client.host(),
            client.port(),
            client.database().unwrap_or("")
        );

        let row = single_row(client.query(METADATA_SQL, &[]).await?, "server metadata")?;
        let version: String = row.get_by_name("version").map_err(Error::from)?;
        let product_version: String = row.get_by_name("product_version").map_err(Error::from)?;
        let edition: Option<String> = row.get_by_name("edition").map_err(Error::from)?;
        let login: Option<String> = row.get_by_name("login_name").map_err(Error::from)?;

        out.detail(format!("Database: {}", product_name(&version)));
        out.detail(format!("Version: {product_version}"));
        if let Some(edition) = edition {
            out.detail(format!("Edition: {edition}"));
        }
        out.detail(format!("Driver: {DRIVER_NAME}"));
        out.detail(format!("URL: {url}"));
        out.detail(format!("Username: {}", login.as_deref().unwrap_or("unknown")));

        client.close().await?;
        Ok(())
    }
}

/// Product line of an `@@VERSION` banner.
///
/// `Microsoft SQL Server 2022 (RTM-CU12) ... - 16.0.4115.5 (X64)` becomes
/// `Microsoft SQL Server 2022 (RTM-CU12)`.
#[must_use]
pub fn product_name(version: &str) -> &str {
    let first_line = version.lines().next().unwrap_or("").trim();
    match first_line.split_once(" - ") {
        Some((product, _)) => product.trim_end(),
        None => first_line,
    }
}
