use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{defaults, envconfig::EnvConfig, validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub database: Option<DatabaseConfig>,
    pub paths: PathsConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        <Self as EnvConfig>::from_env()
    }

    /// Database settings with `url` swapped in when the command line
    /// supplies one.
    pub fn database_with_url(&self, url: Option<&str>) -> Option<DatabaseConfig> {
        match (self.database.clone(), url) {
            (Some(mut database), Some(url)) => {
                database.url = url.to_string();
                Some(database)
            }
            (Some(database), None) => Some(database),
            (None, Some(url)) => Some(DatabaseConfig::new(url)),
            (None, None) => None,
        }
    }
}

impl EnvConfig for AppConfig {
    fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_idle")]
    pub min_idle: u32,
    /// Namespace to introspect on backends that have one (postgres).
    #[serde(default = "default_db_schema")]
    pub schema: String,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_db_max_connections(),
            min_idle: default_db_min_idle(),
            schema: default_db_schema(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub mapping_dir: PathBuf,
    pub entities_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            mapping_dir: PathBuf::from(defaults::DEFAULT_MAPPING_DIR),
            entities_dir: PathBuf::from(defaults::DEFAULT_ENTITIES_DIR),
        }
    }
}

fn default_db_max_connections() -> u32 {
    defaults::DEFAULT_DB_MAX_CONNECTIONS as u32
}

fn default_db_min_idle() -> u32 {
    defaults::DEFAULT_DB_MIN_IDLE as u32
}

fn default_db_schema() -> String {
    defaults::DEFAULT_DB_SCHEMA.to_string()
}
