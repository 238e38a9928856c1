use std::time::Duration;

use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::actor::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub local: LocalStoreConfig,
    pub cloud: CloudConfig,
    pub sync: SyncConfig,
    pub retention: RetentionConfig,
    pub notifications: NotificationConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Where the privileged side of the local store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalEndpoint {
    /// SQLite endpoint served in-process over a duplex stream.
    Embedded,
    /// No privileged endpoint; reads come back empty and writes are dropped.
    Detached,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStoreConfig {
    pub database_url: String,
    pub max_connections: u8,
    pub endpoint: LocalEndpoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    /// Base URL of the cloud REST endpoint. `None` runs fully offline.
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
}

impl CloudConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub drain_interval_secs: u64,
    pub health_interval_secs: u64,
    /// Failed attempts before an entry is parked as dead.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    pub drain_concurrency: usize,
}

impl SyncConfig {
    /// ## Summary
    /// Delay before the next attempt of an entry that has failed `retry_count` times.
    #[must_use]
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry_count.saturating_sub(1));
        let secs = self
            .backoff_base_secs
            .saturating_mul(factor)
            .min(self.backoff_max_secs);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    pub days: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    SingleUser,
    Proxy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    pub proxy: Option<ProxyAuthConfig>,
    pub single_user: Option<SingleUserAuthConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyAuthConfig {}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleUserAuthConfig {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::builder()?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Builds settings from defaults only. Useful for tests and local tooling.
    ///
    /// ## Errors
    /// Returns an error if the defaults fail to deserialize.
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize::<Settings>()?)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("local.database_url", "sqlite://darkroom.db")?
            .set_default("local.max_connections", 4)?
            .set_default("local.endpoint", "embedded")?
            .set_default("cloud.request_timeout_secs", 15)?
            .set_default("cloud.health_timeout_secs", 5)?
            .set_default("sync.drain_interval_secs", 60)?
            .set_default("sync.health_interval_secs", 30)?
            .set_default("sync.max_retries", 25)?
            .set_default("sync.backoff_base_secs", 5)?
            .set_default("sync.backoff_max_secs", 900)?
            .set_default("sync.drain_concurrency", 4)?
            .set_default("retention.days", 30)?
            .set_default("retention.sweep_interval_secs", 21_600)?
            .set_default("notifications.capacity", 50)?
            .set_default("auth.method", "single_user")?
            .set_default("auth.single_user.id", "operator")?
            .set_default("auth.single_user.name", "Studio Operator")?
            .set_default("auth.single_user.role", "manager")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8699)?
            .set_default("logging.level", "debug")?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
