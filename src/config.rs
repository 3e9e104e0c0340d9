//! # Supervisor Configuration
//!
//! Layered configuration built with the `config` crate: compiled defaults, then an
//! optional file named by `SUPERVISOR_CONFIG_FILE`, then `SUPERVISOR__*`
//! environment overrides (e.g. `SUPERVISOR__DATABASE__URL`).

use crate::constants::system;
use crate::error::{SupervisorError, SupervisorResult};
use crate::models::new_id;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: system::DEFAULT_DATABASE_URL.to_string(),
            max_connections: system::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Lock owner identity of this supervisor instance
    pub instance_id: String,
    pub database: DatabaseConfig,
    pub log_format: LogFormat,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            instance_id: new_id(),
            database: DatabaseConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl SupervisorConfig {
    /// Load defaults, the optional config file and environment overrides
    pub fn load() -> SupervisorResult<Self> {
        let file = std::env::var(system::CONFIG_FILE_ENV).ok();
        Self::load_from(file.as_deref().map(Path::new))
    }

    /// Load with an explicit optional config file
    pub fn load_from(file: Option<&Path>) -> SupervisorResult<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("instance_id", defaults.instance_id)?
            .set_default("database.url", defaults.database.url)?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )?
            .set_default("log_format", "pretty")?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: SupervisorConfig = builder
            .add_source(
                Environment::with_prefix(system::CONFIG_ENV_PREFIX)
                    .prefix_separator(system::CONFIG_ENV_SEPARATOR)
                    .separator(system::CONFIG_ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SupervisorResult<()> {
        if self.instance_id.trim().is_empty() {
            return Err(SupervisorError::ConfigurationError(
                "instance_id must not be empty".to_string(),
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(SupervisorError::ConfigurationError(
                "database.url must not be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(SupervisorError::ConfigurationError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
