//! # Structured Logging
//!
//! Subscriber setup and span macros for the tracing ecosystem.
//!
//! Credential values never reach a log line: passwords are carried as
//! [`SecretString`](crate::secrets::SecretString), which redacts itself, and
//! connection targets are logged through
//! [`ConnectionConfig::display_target`](crate::config::ConnectionConfig::display_target).

use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LoggingConfig};
use crate::errors::{CredpoolError, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. A subscriber that is
/// already installed (integration tests, embedding applications) is left in
/// place.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            CredpoolError::config_with_source(
                format!("Invalid log level '{}'", config.level),
                Box::new(e),
            )
        })?;

    let installed = if config.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().with_current_span(true).try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init()
    };

    if let Err(e) = installed {
        tracing::debug!(error = %e, "Global subscriber already installed, keeping it");
    }
    Ok(())
}

/// Create a tracing span around one `new_connection` call.
///
/// Every event logged while resolving credentials and connecting carries the
/// same `attempt_id`:
///
/// ```rust,ignore
/// let span = connect_span!("production");
/// let span = connect_span!("production", secret_id = "db/prod");
/// ```
#[macro_export]
macro_rules! connect_span {
    ($environment:expr) => {
        tracing::info_span!(
            "new_connection",
            environment = %$environment,
            attempt_id = %uuid::Uuid::new_v4()
        )
    };
    ($environment:expr, $($field:tt)*) => {
        tracing::info_span!(
            "new_connection",
            environment = %$environment,
            attempt_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        environment = %config.environment,
        databases = config.databases.len(),
        secret_store = %config.secret_store.backend,
        cache_expiry_seconds = ?config.cache.expiry_seconds,
        min_server_version = config.connector.min_server_version,
        "credpool configuration"
    );
}
