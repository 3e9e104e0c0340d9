//! # Structured Logging Module
//!
//! Environment-aware structured logging for supervisor cycles. Every log line emitted
//! while supervising an installation carries the installation id through the span
//! opened by the supervisor.

use crate::config::LogFormat;
use crate::state_machine::InstallationState;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging(format: LogFormat) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = match format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed(),
        };

        // A global subscriber may already be installed by the embedding process
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            format = ?format,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("SUPERVISOR_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log a persisted installation state change
pub fn log_transition(
    installation_id: &str,
    from: InstallationState,
    to: InstallationState,
    instance_id: &str,
) {
    tracing::info!(
        installation_id = %installation_id,
        from = %from,
        to = %to,
        instance_id = %instance_id,
        timestamp = %Utc::now().to_rfc3339(),
        "INSTALLATION_TRANSITION"
    );
}

/// Log a lock acquisition or release against the store
pub fn log_lock_operation(operation: &str, entity: &str, ids: &[String], owner: &str, ok: bool) {
    tracing::debug!(
        operation = %operation,
        entity = %entity,
        ids = ?ids,
        owner = %owner,
        ok = ok,
        "LOCK_OPERATION"
    );
}
