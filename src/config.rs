//! # Configuration
//!
//! Loads [`Settings`] from an optional file plus `PAYSTORE_*` environment
//! variables, after reading a `.env` file if one exists.
//!
//! Nested keys use `__`:
//!
//! ```text
//! PAYSTORE_DATABASE__URL=postgres://paystore@localhost/paystore
//! PAYSTORE_DATABASE__MAX_CONNECTIONS=20
//! PAYSTORE_VAULT__BASE_URL=https://vault.internal
//! PAYSTORE_VAULT__TIMEOUT_MS=5000
//! PAYSTORE_SESSION__TTL_SECS=1800
//! PAYSTORE_LOGGING__LEVEL=info
//! PAYSTORE_LOGGING__FORMAT=json
//! ```
//!
//! Without a `database` section every repository lives in memory; without
//! a `vault` section cards and sessions stay in process even when the rest
//! is in PostgreSQL.

use crate::domain::Logger;
use crate::domain::entities::DEFAULT_SESSION_TTL_SECS;
use crate::infrastructure::persistence::{RepositoryError, RepositoryResult, SessionOptions};
use crate::infrastructure::vault::VaultClient;
use crate::infrastructure::{Repositories, SensitiveBackend};
use crate::logging::LogFormat;
use ::config::{Config, Environment, File};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PAYSTORE";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_VAULT_TIMEOUT_MS: u64 = 10_000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A backend could not be set up from the loaded settings.
    #[error("Failed to set up repositories: {0}")]
    Repository(#[from] RepositoryError),
}

/// Root settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// PostgreSQL connection; absent means in-memory storage.
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
    /// Card vault; absent means cards and sessions stay in process.
    #[serde(default)]
    pub vault: Option<VaultSettings>,
    /// Session lifetime.
    #[serde(default)]
    pub session: SessionSettings,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Connection DSN.
    pub url: String,
    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Card vault settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultSettings {
    /// Vault root URL.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_vault_timeout_ms")]
    pub timeout_ms: u64,
}

impl VaultSettings {
    /// Builds an HTTP client for the vault.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Internal` if the URL is invalid.
    pub fn client(&self) -> RepositoryResult<VaultClient> {
        VaultClient::new(&self.base_url, self.timeout_ms)
    }
}

/// Session settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SessionSettings {
    /// Time from creation to expiry, in seconds.
    pub ttl_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

impl SessionSettings {
    /// Converts to store options.
    #[must_use]
    pub fn options(&self) -> SessionOptions {
        SessionOptions::with_ttl_secs(self.ttl_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_vault_timeout_ms() -> u64 {
    DEFAULT_VAULT_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Loads settings from `.env`, then `file` (if given and present), then
    /// the environment. Later sources override earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source is malformed.
    pub fn load(file: Option<&str>) -> Result<Self, ConfigError> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        Self::from_environment(file, Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Builds the repository set these settings describe.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Repository` if the database is unreachable or
    /// the vault URL is invalid.
    pub async fn repositories(&self, logger: &Logger) -> Result<Repositories, ConfigError> {
        let session = self.session.options();
        let Some(database) = &self.database else {
            tracing::info!("using in-memory repositories");
            return Ok(Repositories::in_memory(session, logger));
        };

        let pool = connect_pool(database).await?;
        let sensitive = match &self.vault {
            Some(vault) => SensitiveBackend::Vault(vault.client()?),
            None => SensitiveBackend::InMemory,
        };
        tracing::info!(vault = self.vault.is_some(), "using postgres repositories");
        Ok(Repositories::postgres(&pool, sensitive, session, logger))
    }
}

/// Opens a connection pool from a DSN.
///
/// # Errors
///
/// Returns `RepositoryError::Connection` if no connection can be made.
pub async fn connect_pool(settings: &DatabaseSettings) -> RepositoryResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
        .connect(&settings.url)
        .await
        .map_err(|e| RepositoryError::connection(format!("Failed to connect to database: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: ::config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn defaults_without_any_source() {
        let settings = Settings::from_environment(None, env(&[])).unwrap();
        assert!(settings.database.is_none());
        assert!(settings.vault.is_none());
        assert_eq!(settings.session.ttl_secs, 1800);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn nested_environment_keys() {
        let settings = Settings::from_environment(
            None,
            env(&[
                ("PAYSTORE_DATABASE__URL", "postgres://localhost/paystore"),
                ("PAYSTORE_DATABASE__MAX_CONNECTIONS", "3"),
                ("PAYSTORE_VAULT__BASE_URL", "http://vault.local"),
                ("PAYSTORE_SESSION__TTL_SECS", "60"),
                ("PAYSTORE_LOGGING__FORMAT", "json"),
            ]),
        )
        .unwrap();

        let database = settings.database.unwrap();
        assert_eq!(database.url, "postgres://localhost/paystore");
        assert_eq!(database.max_connections, 3);
        let vault = settings.vault.unwrap();
        assert_eq!(vault.timeout_ms, DEFAULT_VAULT_TIMEOUT_MS);
        assert!(vault.client().is_ok());
        assert_eq!(settings.session.options(), SessionOptions::with_ttl_secs(60));
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn log_format_is_case_insensitive() {
        let settings =
            Settings::from_environment(None, env(&[("PAYSTORE_LOGGING__FORMAT", "JSON")])).unwrap();
        assert_eq!(settings.logging.format, LogFormat::Json);

        let settings =
            Settings::from_environment(None, env(&[("PAYSTORE_LOGGING__FORMAT", "text")])).unwrap();
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[tokio::test]
    async fn no_database_means_in_memory() {
        let settings = Settings::default();
        let repos = settings.repositories(&Logger::default()).await.unwrap();
        let ctx = crate::domain::RequestContext::new();
        assert_eq!(
            repos
                .currencies
                .query(&ctx, &crate::domain::entities::CurrencySpec::All)
                .await
                .unwrap()
                .total,
            0
        );
    }
}
