//! # Structured Logging Module
//!
//! Environment-aware structured logging for hooked pools: a console layer,
//! plus a JSON file layer when `POOLHOOK_LOG_DIR` is set.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;

use chrono::Utc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::env;

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once; only the first call installs layers, and an
/// already installed global subscriber is left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(build_filter(&log_level));

        let (file_layer, guard, log_path) = match log_directory() {
            Some(log_dir) => {
                let file_name = format!(
                    "{}.{}.{}.log",
                    environment,
                    process::id(),
                    Utc::now().format("%Y%m%d_%H%M%S")
                );
                let log_path = log_dir.join(&file_name);
                let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(build_filter(&log_level));
                (Some(layer), Some(guard), Some(log_path))
            }
            None => (None, None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            log_file = log_path.as_ref().map(|p| p.display().to_string()),
            "🔧 STRUCTURED LOGGING: Initialized"
        );

        guard
    });
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn log_directory() -> Option<PathBuf> {
    let log_dir = PathBuf::from(std::env::var(env::LOG_DIR).ok()?);
    if !log_dir.exists() {
        if let Err(err) = fs::create_dir_all(&log_dir) {
            eprintln!(
                "poolhook: cannot create log directory {}: {err}; file logging disabled",
                log_dir.display()
            );
            return None;
        }
    }
    Some(log_dir)
}

/// Get current environment from environment variables
pub(crate) fn get_environment() -> String {
    std::env::var(env::ENVIRONMENT)
        .or_else(|_| std::env::var(env::FALLBACK_ENVIRONMENT))
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

/// Log structured data for plugin registry operations
pub fn log_plugin_operation(
    operation: &str,
    pool_id: &str,
    plugin_id: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        pool_id = %pool_id,
        plugin_id = %plugin_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔌 PLUGIN_OPERATION"
    );
}

/// Log a failed plugin hook with full context
pub fn log_hook_failure(pool_id: &str, plugin_id: &str, hook: &str, error: &str) {
    tracing::error!(
        pool_id = %pool_id,
        plugin_id = %plugin_id,
        hook = %hook,
        error = %error,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ PLUGIN_HOOK_FAILED"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var(env::ENVIRONMENT, "test_override");
        let detected = get_environment();
        assert_eq!(detected, "test_override");
        std::env::remove_var(env::ENVIRONMENT);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
    }
}
