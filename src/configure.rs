use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "config/config.yaml";

pub const DEFAULT_DB_PATH: &str = "data/members.db";
pub const DEFAULT_POOL_NAME: &str = "member-pool";
pub const DEFAULT_MAX_POOL_SIZE: u32 = 10;
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Member id that always fails destination validation. Used to exercise the rollback path.
pub const RESERVED_MEMBER_ID: &str = "ex";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: String,
    pub database: DatabaseConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_name: String,
    pub max_pool_size: u32,
    pub min_idle: Option<u32>,
    pub connection_timeout_ms: u64,
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
            pool_name: DEFAULT_POOL_NAME.to_string(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            min_idle: None,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub reserved_member_ids: Vec<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            reserved_member_ids: vec![RESERVED_MEMBER_ID.to_string()],
        }
    }
}

/// Load configuration: built-in defaults, then the YAML file (if present), then `APP__*` env vars.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    let s = Config::builder()
        // Set defaults
        .set_default("log_level", "info")?
        .set_default("log_to_file", false)?
        .set_default("log_file", "log/member_transfer.log")?
        .set_default("database.path", DEFAULT_DB_PATH)?
        .set_default("database.pool_name", DEFAULT_POOL_NAME)?
        .set_default("database.max_pool_size", DEFAULT_MAX_POOL_SIZE as i64)?
        .set_default(
            "database.connection_timeout_ms",
            DEFAULT_CONNECTION_TIMEOUT_MS as i64,
        )?
        .set_default("database.busy_timeout_ms", DEFAULT_BUSY_TIMEOUT_MS as i64)?
        .set_default("transfer.reserved_member_ids", vec![RESERVED_MEMBER_ID])?
        // Add configuration from a file
        .add_source(File::with_name(path).required(false))
        // Add configuration from environment variables
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    s.try_deserialize()
}
