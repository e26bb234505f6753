//! Server configuration.
//!
//! Values are merged in this order, later wins:
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, `TALLY_CONFIG`, or `./tally.toml` if present)
//! 3. Environment variables (`TALLY_*`)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tally_audit::AuditConfig;
use tally_core::error::TallyError;
use tally_db::DbConfig;
use thiserror::Error;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParse {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{var}': {reason}")]
    InvalidValue { var: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for TallyError {
    fn from(err: ConfigError) -> Self {
        TallyError::Validation {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub audit: AuditConfig,
    /// Create missing built-in permissions and system roles at startup.
    pub seed_defaults: bool,
    /// Hours between audit retention sweeps.
    pub retention_interval_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            audit: AuditConfig::default(),
            seed_defaults: true,
            retention_interval_hours: 24,
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or from `./tally.toml` when it exists, then apply
    /// `TALLY_*` overrides from the process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load_from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|var| std::env::var(var).ok())
    }

    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|error| ConfigError::TomlParse {
            file: path.to_path_buf(),
            error,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply overrides of the form `TALLY_<SECTION>_<KEY>`.
    ///
    /// `lookup` returns the value of a variable if it is set.
    pub fn apply_env_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TALLY_DB_URL") {
            self.db.url = v;
        }
        if let Some(v) = lookup("TALLY_DB_NAMESPACE") {
            self.db.namespace = v;
        }
        if let Some(v) = lookup("TALLY_DB_DATABASE") {
            self.db.database = v;
        }
        if let Some(v) = lookup("TALLY_DB_USERNAME") {
            self.db.username = Some(v);
        }
        if let Some(v) = lookup("TALLY_DB_PASSWORD") {
            self.db.password = Some(v);
        }
        if let Some(v) = lookup("TALLY_AUDIT_RETENTION_DAYS") {
            self.audit.retention_days = parse_number("TALLY_AUDIT_RETENTION_DAYS", &v)?;
        }
        if let Some(v) = lookup("TALLY_AUDIT_MAX_PAGE_SIZE") {
            self.audit.max_page_size = parse_number("TALLY_AUDIT_MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("TALLY_SEED_DEFAULTS") {
            self.seed_defaults = matches!(v.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        Ok(self)
    }
}

fn parse_number<T>(var: &str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: var.to_string(),
        reason: e.to_string(),
    })
}
