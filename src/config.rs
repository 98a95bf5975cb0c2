//! Configuration loader and validator for the provisioner.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    /// Optional local audit database; when absent, provisioning runs are
    /// not recorded.
    #[serde(default)]
    pub audit: Option<DatabaseConfig>,
}

/// Remote API endpoint and admin credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// Connection-pool knobs for the audit database. The defaults mirror the
/// backing application's pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_max_overflow")]
    pub max_overflow: u32,
    #[serde(default = "default_pool_timeout_secs")]
    pub pool_timeout_secs: u64,
    #[serde(default = "default_pool_recycle_secs")]
    pub pool_recycle_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_statement_cache_size")]
    pub statement_cache_size: usize,
}

fn default_pool_size() -> u32 {
    5
}

fn default_max_overflow() -> u32 {
    10
}

fn default_pool_timeout_secs() -> u64 {
    30
}

fn default_pool_recycle_secs() -> u64 {
    1800
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_statement_cache_size() -> usize {
    100
}

impl Config {
    /// The validated base URL. Only call after [`load`] has succeeded.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api.base_url)
            .map_err(|_| ConfigError::Invalid("api.base_url must be a valid URL"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if Url::parse(&cfg.api.base_url).is_err() {
        return Err(ConfigError::Invalid("api.base_url must be a valid URL"));
    }
    if cfg.api.admin_email.trim().is_empty() {
        return Err(ConfigError::Invalid("api.admin_email must be non-empty"));
    }
    if cfg.api.admin_password.trim().is_empty() {
        return Err(ConfigError::Invalid("api.admin_password must be non-empty"));
    }

    if let Some(audit) = &cfg.audit {
        if audit.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid("audit.database_url must be non-empty"));
        }
        if audit.pool_size == 0 {
            return Err(ConfigError::Invalid("audit.pool_size must be > 0"));
        }
    }

    Ok(())
}

/// Example YAML configuration.
pub fn example() -> &'static str {
    r#"api:
  base_url: "https://0xarchit-citytrack.hf.space"
  admin_email: "zrxarchit@gmail.com"
  admin_password: "12345678"

audit:
  database_url: "sqlite://./data/provisioner.db"
  pool_size: 5
  max_overflow: 10
  pool_timeout_secs: 30
  pool_recycle_secs: 1800
  idle_timeout_secs: 600
  statement_cache_size: 100
"#
}
