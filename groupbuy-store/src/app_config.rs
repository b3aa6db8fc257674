use groupbuy_shared::Masked;
use serde::Deserialize;
use std::env;

pub const ENV_PREFIX: &str = "GROUPBUY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingValues(Vec<String>),
    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

/// Settings for one reconciliation run, built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub migration: MigrationConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Masked<String>,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_collection() -> String { "offers".to_string() }
fn default_page_size() -> usize { 200 }
fn default_concurrency() -> usize { 4 }
fn default_max_attempts() -> u32 { 1 }
fn default_base_delay_ms() -> u64 { 200 }
fn default_max_delay_ms() -> u64 { 5_000 }
fn default_port() -> u16 { 5432 }
fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout_secs() -> u64 { 3 }

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            page_size: default_page_size(),
            concurrency: default_concurrency(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

// Shape as read from the sources, before required keys are checked.
#[derive(Debug, Deserialize, Default)]
struct RawSettings {
    #[serde(default)]
    database: RawDatabaseConfig,
    #[serde(default)]
    migration: MigrationConfig,
    #[serde(default)]
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct RawDatabaseConfig {
    host: Option<String>,
    #[serde(default = "default_port")]
    port: u16,
    user: Option<String>,
    password: Option<Masked<String>>,
    name: Option<String>,
    #[serde(default = "default_max_connections")]
    max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    acquire_timeout_secs: u64,
}

impl Default for RawDatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            user: None,
            password: None,
            name: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Environment variable that feeds a dotted configuration key.
pub fn env_var_for(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.replace('.', "__").to_uppercase())
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(Self::environment())
            .build()?;

        Self::from_config(s)
    }

    /// GROUPBUY_DATABASE__HOST -> database.host. Values stay strings so
    /// secrets like `007` keep their leading zeros.
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    /// Validate already-merged sources. Every missing required key is reported at once.
    pub fn from_config(source: config::Config) -> Result<Self, ConfigError> {
        let raw: RawSettings = source.try_deserialize()?;
        let db = raw.database;

        let mut missing = Vec::new();
        let mut require = |key: &str, value: Option<String>| -> String {
            match value.filter(|v| !v.trim().is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(format!("{} ({})", key, env_var_for(key)));
                    String::new()
                }
            }
        };

        let host = require("database.host", db.host);
        let user = require("database.user", db.user);
        let password = require("database.password", db.password.map(|p| p.0));
        let name = require("database.name", db.name);

        if !missing.is_empty() {
            return Err(ConfigError::MissingValues(missing));
        }

        let settings = Self {
            database: DatabaseConfig {
                host,
                port: db.port,
                user,
                password: Masked(password),
                name,
                max_connections: db.max_connections,
                acquire_timeout_secs: db.acquire_timeout_secs,
            },
            migration: raw.migration,
            retry: raw.retry,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("database.max_connections", self.database.max_connections as u64),
            ("migration.page_size", self.migration.page_size as u64),
            ("migration.concurrency", self.migration.concurrency as u64),
            ("retry.max_attempts", self.retry.max_attempts as u64),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid {
                key: "retry.base_delay_ms".to_string(),
                reason: format!("exceeds retry.max_delay_ms ({})", self.retry.max_delay_ms),
            });
        }
        Ok(())
    }
}
