//! Configuration management

use plugreg_core::{Error, Result, SortSpec};
use serde::{Deserialize, Serialize};

const DEFAULT_DATABASE_URL: &str = "sqlite:data/plugreg.db";
const DEFAULT_PAGE_SIZE: i64 = 15;
const DEFAULT_SORT: &str = "-createdAt";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Page size used by `list` when `--count` is omitted
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,

    /// Ordering used by `list` when `--sort` is omitted
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_sort() -> String {
    DEFAULT_SORT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            default_page_size: default_page_size(),
            default_sort: default_sort(),
        }
    }
}

impl Config {
    /// Load configuration from file or environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config = if let Some(p) = path {
            Self::load_from_file(p)?
        } else {
            Self::load_from_env()?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from configuration file
    fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    fn load_from_env() -> Result<Self> {
        let database_url = get_secret("DATABASE_URL").unwrap_or_else(default_database_url);

        let default_page_size = match std::env::var("PLUGREG_PAGE_SIZE") {
            Ok(v) => v
                .parse()
                .map_err(|_| Error::ConfigError(format!("Invalid PLUGREG_PAGE_SIZE: {}", v)))?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let default_sort = std::env::var("PLUGREG_SORT").unwrap_or_else(|_| default_sort());

        Ok(Config {
            database_url,
            default_page_size,
            default_sort,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.default_page_size <= 0 {
            return Err(Error::ConfigError(format!(
                "Page size must be positive, got {}",
                self.default_page_size
            )));
        }
        self.sort()?;
        Ok(())
    }

    /// Parsed default ordering
    pub fn sort(&self) -> Result<SortSpec> {
        SortSpec::parse(&self.default_sort)
            .map_err(|e| Error::ConfigError(format!("Invalid default sort: {}", e)))
    }
}

/// Get secret from environment variable or file
///
/// If `VAR_NAME` is not set, `VAR_NAME_FILE` may point to a file holding the
/// value (Docker/Kubernetes secrets).
pub fn get_secret(var_name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(var_name) {
        return Some(value);
    }

    let file_var = format!("{}_FILE", var_name);
    if let Ok(path) = std::env::var(&file_var) {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            return Some(contents.trim().to_string());
        }
    }

    None
}
