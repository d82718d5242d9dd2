//! # Configuration Management
//!
//! Configuration is read with the `config` crate from an optional file (TOML
//! or YAML, chosen by extension) overlaid with `CREDPOOL__*` environment
//! variables, where `__` separates nesting levels:
//!
//! ```text
//! CREDPOOL__SECRET_STORE__BACKEND=env
//! CREDPOOL__DATABASES__PRODUCTION__AWS_SECRET=db/prod
//! ```
//!
//! The active environment comes from `--env`, then `CREDPOOL_ENV`, then
//! `APP_ENV`, then the `environment` key, then `development`.

pub mod settings;

use std::path::Path;
use tracing::debug;

use crate::errors::Result;

pub use settings::{
    AppConfig, CacheConfig, ConnectionConfig, ConnectorConfig, LoggingConfig, PoolConfig,
    SecretStoreConfig, DEFAULT_ENVIRONMENT, DEFAULT_MIN_SERVER_VERSION, DEFAULT_PORT,
};

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "CREDPOOL";

/// Load and validate configuration.
///
/// `environment` is the command-line override, if any.
pub fn load_config(path: Option<&Path>, environment: Option<&str>) -> Result<AppConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        debug!(path = %path.display(), "Loading configuration file");
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let mut app: AppConfig = builder.build()?.try_deserialize()?;
    app.environment = resolve_environment(environment, &app.environment);
    app.validate()?;

    debug!(
        environment = %app.environment,
        databases = app.databases.len(),
        backend = %app.secret_store.backend,
        "Configuration loaded"
    );
    Ok(app)
}

/// Pick the active environment name.
pub fn resolve_environment(flag: Option<&str>, configured: &str) -> String {
    resolve_environment_with(flag, configured, |name| std::env::var(name).ok())
}

fn resolve_environment_with<F>(flag: Option<&str>, configured: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |s: String| {
        let trimmed = s.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    flag.map(str::to_string)
        .and_then(non_empty)
        .or_else(|| lookup("CREDPOOL_ENV").and_then(non_empty))
        .or_else(|| lookup("APP_ENV").and_then(non_empty))
        .or_else(|| non_empty(configured.to_string()))
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}
