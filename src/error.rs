//! Error types for the fleet supervisor.
//!

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SupervisorError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Provisioner error: {0}")]
    ProvisionerError(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl SupervisorError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        SupervisorError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<sqlx::Error> for SupervisorError {
    fn from(err: sqlx::Error) -> Self {
        SupervisorError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for SupervisorError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        SupervisorError::DatabaseError(format!("Migration failed: {err}"))
    }
}

impl From<config::ConfigError> for SupervisorError {
    fn from(err: config::ConfigError) -> Self {
        SupervisorError::ConfigurationError(err.to_string())
    }
}

pub type SupervisorResult<T> = std::result::Result<T, SupervisorError>;
