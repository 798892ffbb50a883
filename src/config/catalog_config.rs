use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::CatalogError;

/// Settings for one catalog source, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub api: ApiSection,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub page_size: usize,
    pub probe_limit: usize,
}

/// Fan-out and retry behaviour for page requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub actual_path: String,
    pub expected_path: String,
}

impl CatalogConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog config file: {}", path))?;

        let mut config: CatalogConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse catalog config file: {}", path))?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// `CATALOG_BASE_URL`, `CATALOG_ACTUAL_PATH` and `CATALOG_EXPECTED_PATH` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("CATALOG_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(path) = env::var("CATALOG_ACTUAL_PATH") {
            self.storage.actual_path = path;
        }
        if let Ok(path) = env::var("CATALOG_EXPECTED_PATH") {
            self.storage.expected_path = path;
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.api.base_url.is_empty() {
            return Err(CatalogError::Config("api.base_url cannot be empty".into()));
        }

        if self.pagination.page_size == 0 {
            return Err(CatalogError::Config("pagination.page_size must be positive".into()));
        }

        if self.pagination.probe_limit == 0 {
            return Err(CatalogError::Config("pagination.probe_limit must be positive".into()));
        }

        if self.fetch.concurrency == 0 {
            return Err(CatalogError::Config("fetch.concurrency must be positive".into()));
        }

        if self.fetch.max_retries == 0 {
            return Err(CatalogError::Config("fetch.max_retries must be at least 1".into()));
        }

        if self.fetch.timeout_seconds == 0 {
            return Err(CatalogError::Config("fetch.timeout_seconds must be positive".into()));
        }

        if self.storage.actual_path.is_empty() || self.storage.expected_path.is_empty() {
            return Err(CatalogError::Config("storage paths cannot be empty".into()));
        }

        Ok(())
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            probe_limit: 1,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_retries: 3,
            retry_backoff_ms: 500,
            timeout_seconds: 30,
        }
    }
}
