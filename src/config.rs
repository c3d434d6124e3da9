//! Configuration loader and validator for the back-office UI core.
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::PAGE_SIZES;

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
    pub ui: Ui,
    pub jobs: Jobs,
}

/// Backend endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// Listing-screen timings and defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ui {
    pub search_debounce_ms: u64,
    pub default_page_size: u32,
}

/// Export-job polling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jobs {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Config {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.ui.search_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.jobs.poll_interval_ms)
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
    if url::Url::parse(&cfg.api.base_url).is_err() {
        return Err(ConfigError::Invalid("api.base_url must be a valid URL"));
    }
    if cfg.api.timeout_ms == 0 {
        return Err(ConfigError::Invalid("api.timeout_ms must be > 0"));
    }

    if cfg.ui.search_debounce_ms == 0 {
        return Err(ConfigError::Invalid("ui.search_debounce_ms must be > 0"));
    }
    if !PAGE_SIZES.contains(&cfg.ui.default_page_size) {
        return Err(ConfigError::Invalid(
            "ui.default_page_size must be one of 10, 25, 50, 100",
        ));
    }

    if cfg.jobs.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("jobs.poll_interval_ms must be > 0"));
    }
    if cfg.jobs.max_polls == 0 {
        return Err(ConfigError::Invalid("jobs.max_polls must be > 0"));
    }

    Ok(())
}

/// Example configuration, used by docs and tests.
pub fn example() -> &'static str {
    r#"api:
  base_url: "https://api.edufran.com.br"
  timeout_ms: 10000

ui:
  search_debounce_ms: 500
  default_page_size: 25

jobs:
  poll_interval_ms: 2000
  max_polls: 60
"#
}
