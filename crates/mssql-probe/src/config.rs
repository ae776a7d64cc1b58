//! Probe configuration.
//!
//! Connection settings follow the `MSSQL_*` environment variables used by
//! the driver's own examples and integration tests, and are handed to the
//! driver as an ADO.NET-style connection string.

use std::time::Duration;

use mssql_client::Config;
use mssql_driver_pool::PoolConfig;

use crate::error::{ProbeError, Result};

/// Environment variable holding a complete connection string.
pub const ENV_CONNECTION_STRING: &str = "MSSQL_CONNECTION_STRING";
/// Environment variable for the server host.
pub const ENV_HOST: &str = "MSSQL_HOST";
/// Environment variable for the server port.
pub const ENV_PORT: &str = "MSSQL_PORT";
/// Environment variable for the database name.
pub const ENV_DATABASE: &str = "MSSQL_DATABASE";
/// Environment variable for the login name.
pub const ENV_USER: &str = "MSSQL_USER";
/// Environment variable for the login password.
pub const ENV_PASSWORD: &str = "MSSQL_PASSWORD";
/// Environment variable toggling TLS encryption.
pub const ENV_ENCRYPT: &str = "MSSQL_ENCRYPT";

/// Where the probe connects and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database holding the sample schema.
    pub database: String,
    /// SQL login name.
    pub user: String,
    /// SQL login password.
    pub password: String,
    /// Require TLS.
    pub encrypt: bool,
    /// Accept self-signed server certificates.
    pub trust_server_certificate: bool,
    /// Application name reported to the server.
    pub application_name: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Command timeout.
    pub command_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1433,
            database: "app_schema".to_string(),
            user: "sa".to_string(),
            password: "Password123!".to_string(),
            encrypt: false,
            trust_server_certificate: true,
            application_name: "mssql-probe".to_string(),
            connect_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl ConnectionSettings {
    /// Read settings from the process environment.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// Empty or blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        if let Some(host) = lookup(ENV_HOST) {
            settings.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            settings.port = port
                .trim()
                .parse()
                .map_err(|_| ProbeError::Config(format!("invalid {ENV_PORT}: {port}")))?;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            settings.database = database;
        }
        if let Some(user) = lookup(ENV_USER) {
            settings.user = user;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            settings.password = password;
        }
        if let Some(encrypt) = lookup(ENV_ENCRYPT) {
            settings.encrypt = parse_bool(&encrypt)
                .ok_or_else(|| ProbeError::Config(format!("invalid {ENV_ENCRYPT}: {encrypt}")))?;
        }

        Ok(settings)
    }

    /// Render an ADO.NET-style connection string.
    ///
    /// The driver splits on `;` without quoting and trims every value, so
    /// values containing `;` or carrying surrounding whitespace are rejected.
    pub fn connection_string(&self) -> Result<String> {
        for (key, value) in [
            ("host", self.host.as_str()),
            ("database", self.database.as_str()),
            ("user", self.user.as_str()),
            ("password", self.password.as_str()),
            ("application name", self.application_name.as_str()),
        ] {
            if value.contains(';') {
                return Err(ProbeError::Config(format!("{key} must not contain ';'")));
            }
            if value.trim() != value {
                return Err(ProbeError::Config(format!(
                    "{key} must not start or end with whitespace"
                )));
            }
        }

        Ok(format!(
            "Server={},{};Database={};User Id={};Password={};Encrypt={};\
             TrustServerCertificate={};Application Name={};Connect Timeout={};Command Timeout={}",
            self.host,
            self.port,
            self.database,
            self.user,
            self.password,
            self.encrypt,
            self.trust_server_certificate,
            self.application_name,
            whole_seconds(self.connect_timeout),
            whole_seconds(self.command_timeout),
        ))
    }

    /// Build the driver configuration.
    pub fn client_config(&self) -> Result<Config> {
        Ok(Config::from_connection_string(&self.connection_string()?)?)
    }
}

/// Extra connection parameters for the "connection with properties" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunedSettings {
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// Per-command read timeout.
    pub read_timeout: Duration,
}

impl Default for TunedSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
        }
    }
}

/// Bounds handed to the connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of connections.
    pub max_size: u32,
    /// Connections kept open while idle.
    pub min_idle: u32,
    /// Time to wait for a connection.
    pub connection_timeout: Duration,
    /// Time a connection may sit idle before being closed.
    pub idle_timeout: Duration,
    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 5,
            min_idle: 2,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl PoolSettings {
    /// Build and validate the pool configuration.
    pub fn to_pool_config(&self) -> Result<PoolConfig> {
        let config = PoolConfig::new()
            .min_connections(self.min_idle)
            .max_connections(self.max_size)
            .connection_timeout(self.connection_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime);
        config.validate()?;
        Ok(config)
    }
}

/// Everything a probe run needs.
#[derive(Debug, Clone, Default)]
pub struct ProbeConfig {
    /// Base connection settings.
    pub connection: ConnectionSettings,
    /// Verbatim connection string overriding `connection` for the driver.
    pub connection_string: Option<String>,
    /// Timeouts for the tuned connection.
    pub tuned: TunedSettings,
    /// Pool bounds.
    pub pool: PoolSettings,
}

impl ProbeConfig {
    /// Configuration with the given connection settings and defaults elsewhere.
    #[must_use]
    pub fn new(connection: ConnectionSettings) -> Self {
        Self {
            connection,
            ..Self::default()
        }
    }

    /// Read the connection settings and an optional verbatim connection
    /// string from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProbeConfig::from_env`] over an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::new(ConnectionSettings::from_lookup(&lookup)?);
        Ok(match lookup(ENV_CONNECTION_STRING) {
            Some(conn_str) if !conn_str.trim().is_empty() => {
                config.with_connection_string(conn_str)
            }
            _ => config,
        })
    }

    /// Use a verbatim connection string instead of the discrete settings.
    #[must_use]
    pub fn with_connection_string(mut self, conn_str: impl Into<String>) -> Self {
        self.connection_string = Some(conn_str.into());
        self
    }

    /// Driver configuration for a plain connection.
    pub fn client_config(&self) -> Result<Config> {
        match &self.connection_string {
            Some(conn_str) => Ok(Config::from_connection_string(conn_str)?),
            None => self.connection.client_config(),
        }
    }

    /// Driver configuration with the tuned timeouts applied.
    pub fn tuned_client_config(&self) -> Result<Config> {
        let mut config = self.client_config()?;
        config.connect_timeout = self.tuned.connect_timeout;
        config.command_timeout = self.tuned.read_timeout;
        config.timeouts = config
            .timeouts
            .clone()
            .connect_timeout(self.tuned.connect_timeout)
            .command_timeout(self.tuned.read_timeout);
        Ok(config)
    }

    /// Driver configuration targeting another database on the same server.
    pub fn client_config_for(&self, database: &str) -> Result<Config> {
        let mut config = self.client_config()?;
        config.database = Some(database.to_string());
        Ok(config)
    }

    /// Database the checks run against.
    pub fn database(&self) -> Result<String> {
        self.client_config()?
            .database
            .ok_or_else(|| ProbeError::Config("no database configured".into()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs().max(1)
}
