//! Pooled connections.

use async_trait::async_trait;
use mssql_client::Error;
use mssql_driver_pool::Pool;

use super::single_row;
use crate::check::{Check, CheckKind, ProbeContext};
use crate::error::Result;
use crate::report::Transcript;

const ACQUISITIONS: i32 = 3;

const POOL_MESSAGE_SQL: &str =
    "SELECT N'Pool Connection ' + CAST(@p1 AS NVARCHAR(10)) AS message";

/// Builds a pool and checks out connections from it one at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionPool;

#[async_trait]
impl Check for ConnectionPool {
    fn kind(&self) -> CheckKind {
        CheckKind::Pool
    }

    fn title(&self) -> &'static str {
        "Testing connection pool"
    }

    fn label(&self) -> &'static str {
        "Connection pool test"
    }

    async fn run(&self, ctx: &ProbeContext, out: &mut Transcript) -> Result<()> {
        let pool = ctx.build_pool().await?;
        out.pass("Connection pool created successfully!");

        let result = exercise(&pool, out).await;
        pool.close().await;
        result
    }
}

async fn exercise(pool: &Pool, out: &mut Transcript) -> Result<()> {
    for i in 1..=ACQUISITIONS {
        let mut conn = pool.get().await?;
        tracing::debug!(connection_id = conn.metadata().id, attempt = i, "checked out");
        out.detail(format!("Connection {i} acquired from pool"));

        let row = single_row(conn.query(POOL_MESSAGE_SQL, &[&i]).await?, "pool query")?;
        let message: String = row.get_by_name("message").map_err(Error::from)?;
        out.nested(message);
    }

    let status = pool.status();
    out.detail("Pool statistics:");
    out.nested(format!("Active connections: {}", status.in_use));
    out.nested(format!("Idle connections: {}", status.available));
    out.nested(format!("Total connections: {}", status.total));
    out.nested(format!("Max connections: {}", status.max));

    let metrics = pool.metrics();
    out.nested(format!("Connections created: {}", metrics.connections_created));
    out.nested(format!(
        "Checkout success rate: {:.2}%",
        metrics.checkout_success_rate() * 100.0
    ));
    Ok(())
}
