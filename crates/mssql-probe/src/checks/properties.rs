//! Connection with explicit timeouts.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use mssql_client::Error;

use super::single_row;
use crate::check::{Check, CheckKind, ProbeContext};
use crate::error::Result;
use crate::report::Transcript;

const GREETING_SQL: &str =
    "SELECT N'Hello SQL Server!' AS message, SYSDATETIME() AS [current_time]";

/// Connects with the tuned timeouts and runs a trivial query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionProperties;

#[async_trait]
impl Check for ConnectionProperties {
    fn kind(&self) -> CheckKind {
        CheckKind::Properties
    }

    fn title(&self) -> &'static str {
        "Testing connection with properties"
    }

    fn label(&self) -> &'static str {
        "Connection with properties"
    }

    async fn run(&self, ctx: &ProbeContext, out: &mut Transcript) -> Result<()> {
        let tuned = ctx.config().tuned;
        let mut client = ctx.connect_tuned().await?;
        out.pass("Connection with properties successful!");
        out.detail(format!(
            "Connect timeout: {}s, read timeout: {}s",
            tuned.connect_timeout.as_secs(),
            tuned.read_timeout.as_secs()
        ));

        let row = single_row(client.query(GREETING_SQL, &[]).await?, "greeting query")?;
        let message: String = row.get_by_name("message").map_err(Error::from)?;
        let now: NaiveDateTime = row.get_by_name("current_time").map_err(Error::from)?;

        out.detail(format!("Message: {message}"));
        out.detail(format!("Server Time: {}", now.format("%Y-%m-%d %H:%M:%S%.3f")));

        client.close().await?;
        Ok(())
    }
}
