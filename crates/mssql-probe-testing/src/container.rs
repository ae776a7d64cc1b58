//! Disposable SQL Server containers via testcontainers.

use std::borrow::Cow;

use mssql_probe::{ConnectionSettings, ProbeConfig, ProbeContext, sample};
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, Image};

use crate::error::Result;

/// Port SQL Server listens on inside the container.
pub const SQL_SERVER_PORT: u16 = 1433;

/// The official Microsoft SQL Server image.
#[derive(Debug, Clone)]
pub struct SqlServerImage {
    /// SA password; must satisfy the server's complexity policy.
    pub password: String,
    /// Image tag (server version).
    pub tag: String,
}

impl Default for SqlServerImage {
    fn default() -> Self {
        Self {
            password: "Password123!".to_string(),
            tag: "2022-latest".to_string(),
        }
    }
}

impl SqlServerImage {
    /// Set the SA password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the image tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

impl Image for SqlServerImage {
    fn name(&self) -> &str {
        "mcr.microsoft.com/mssql/server"
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![
            WaitFor::message_on_stdout("SQL Server is now ready for client connections"),
            WaitFor::seconds(5),
        ]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        vec![
            ("ACCEPT_EULA", "Y"),
            ("MSSQL_SA_PASSWORD", self.password.as_str()),
            ("MSSQL_PID", "Developer"),
        ]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(SQL_SERVER_PORT)]
    }
}

/// A running SQL Server container and the probe settings that reach it.
///
/// The container is removed when this value is dropped.
pub struct ProbeServer {
    container: ContainerAsync<SqlServerImage>,
    settings: ConnectionSettings,
}

impl ProbeServer {
    /// Start `image` and point the probe at `database` on it.
    pub async fn start(image: SqlServerImage, database: &str) -> Result<Self> {
        let password = image.password.clone();
        tracing::info!(tag = %image.tag, "starting SQL Server container");
        let container = image.start().await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(SQL_SERVER_PORT).await?;
        tracing::info!(%host, port, "SQL Server container ready");

        let settings = ConnectionSettings {
            host,
            port,
            database: database.to_string(),
            user: "sa".to_string(),
            password,
            ..ConnectionSettings::default()
        };

        Ok(Self {
            container,
            settings,
        })
    }

    /// Settings reaching the container.
    #[must_use]
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Probe context for the container with default tuning and pool bounds.
    #[must_use]
    pub fn context(&self) -> ProbeContext {
        ProbeContext::new(ProbeConfig::new(self.settings.clone()))
    }

    /// Create the database and install the sample schema.
    pub async fn install_sample(&self) -> Result<()> {
        let steps = sample::install(&self.context()).await?;
        tracing::debug!(?steps, "sample schema installed");
        Ok(())
    }

    /// Container id, for log correlation.
    #[must_use]
    pub fn id(&self) -> &str {
        self.container.id()
    }
}
