//! # Configuration Settings
//!
//! Defines the configuration structure for credpool.

use crate::errors::{CredpoolError, Result};
use crate::secrets::{CredentialPayload, SecretRequest, SecretStoreType, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_PORT: u16 = 5432;
/// PostgreSQL 9.3
pub const DEFAULT_MIN_SERVER_VERSION: u32 = 90300;

const SSL_MODES: &[&str] = &["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment; selects the `databases` entry and the cache key
    #[validate(length(min = 1, message = "Environment cannot be empty"))]
    pub environment: String,

    /// Connection settings per environment
    pub databases: HashMap<String, ConnectionConfig>,

    #[validate(nested)]
    pub secret_store: SecretStoreConfig,

    #[validate(nested)]
    pub cache: CacheConfig,

    #[validate(nested)]
    pub connector: ConnectorConfig,

    #[validate(nested)]
    pub pool: PoolConfig,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            databases: HashMap::new(),
            secret_store: SecretStoreConfig::default(),
            cache: CacheConfig::default(),
            connector: ConnectorConfig::default(),
            pool: PoolConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(CredpoolError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        for (environment, database) in &self.databases {
            Validate::validate(database).map_err(|e| {
                CredpoolError::validation_field(
                    format!("{}", CredpoolError::from(e)),
                    format!("databases.{}", environment),
                )
            })?;

            if database.secret_reference().is_none()
                && (database.host.trim().is_empty() || database.username.trim().is_empty())
            {
                return Err(CredpoolError::validation_field(
                    "host and username are required when no secret_ref is configured",
                    format!("databases.{}", environment),
                ));
            }
        }

        if self.pool.min_connections > self.pool.max_connections {
            return Err(CredpoolError::validation_field(
                "min_connections cannot exceed max_connections",
                "pool.min_connections",
            ));
        }

        if !SSL_MODES.contains(&self.connector.ssl_mode.as_str()) {
            return Err(CredpoolError::validation_field(
                format!(
                    "Unknown ssl_mode '{}' (expected one of: {})",
                    self.connector.ssl_mode,
                    SSL_MODES.join(", ")
                ),
                "connector.ssl_mode",
            ));
        }

        Ok(())
    }

    /// Connection settings for the named environment
    pub fn database(&self, environment: &str) -> Result<&ConnectionConfig> {
        self.databases.get(environment).ok_or_else(|| {
            let mut known: Vec<&str> = self.databases.keys().map(String::as_str).collect();
            known.sort_unstable();
            CredpoolError::config(format!(
                "No database configured for environment '{}' (configured: {})",
                environment,
                if known.is_empty() { "none".to_string() } else { known.join(", ") }
            ))
        })
    }

    /// Connection settings for the active environment
    pub fn current_database(&self) -> Result<&ConnectionConfig> {
        self.database(&self.environment)
    }
}

/// Static connection settings for one environment.
///
/// When `secret_ref` is set, `host`, `port`, `database`, `username` and
/// `password` are defaults that resolved credentials override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,

    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    pub database: String,

    pub username: String,

    pub password: SecretString,

    /// Secret holding the credential document; empty counts as absent
    #[serde(alias = "aws_secret", skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_profile: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: String::new(),
            username: String::new(),
            password: SecretString::default(),
            secret_ref: None,
            secret_region: None,
            secret_profile: None,
        }
    }
}

impl ConnectionConfig {
    /// The secret reference, if one is configured and non-blank
    pub fn secret_reference(&self) -> Option<&str> {
        self.secret_ref.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn uses_secret(&self) -> bool {
        self.secret_reference().is_some()
    }

    /// Secret store request for this configuration's secret
    pub fn secret_request(&self) -> Option<SecretRequest> {
        let mut request = SecretRequest::new(self.secret_reference()?);
        if let Some(region) = self.secret_region.as_deref().filter(|r| !r.is_empty()) {
            request = request.with_region(region);
        }
        if let Some(profile) = self.secret_profile.as_deref().filter(|p| !p.is_empty()) {
            request = request.with_profile(profile);
        }
        Some(request)
    }

    /// Working copy with resolved credentials laid over the static values.
    ///
    /// A payload without `port` or `dbname` keeps the configured value.
    pub fn with_credentials(&self, credentials: &CredentialPayload) -> Self {
        let mut effective = self.clone();
        effective.host = credentials.host.clone();
        if let Some(port) = credentials.port {
            effective.port = port;
        }
        if let Some(database) = &credentials.database {
            effective.database = database.clone();
        }
        effective.username = credentials.username.clone();
        effective.password = credentials.password.clone();
        effective
    }

    /// `user@host:port/database`, safe to log
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.username, self.host, self.port, self.database)
    }
}

/// Secret store selection and client settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SecretStoreConfig {
    pub backend: SecretStoreType,

    /// Default AWS region
    pub region: Option<String>,

    /// Default AWS shared-credentials profile
    pub profile: Option<String>,

    /// Secrets Manager endpoint override
    #[validate(url(message = "Secret store endpoint must be a valid URL"))]
    pub endpoint: Option<String>,

    #[validate(url(message = "Vault address must be a valid URL"))]
    pub vault_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_token: Option<SecretString>,

    pub vault_namespace: Option<String>,

    /// KV v2 mount path (default "secret")
    pub vault_mount: Option<String>,

    /// Variable prefix for the environment store
    pub env_prefix: Option<String>,

    #[validate(range(
        min = 1,
        max = 300,
        message = "Request timeout must be between 1 and 300 seconds"
    ))]
    pub request_timeout_seconds: u64,
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            backend: SecretStoreType::default(),
            region: None,
            profile: None,
            endpoint: None,
            vault_address: None,
            vault_token: None,
            vault_namespace: None,
            vault_mount: None,
            env_prefix: None,
            request_timeout_seconds: 10,
        }
    }
}

impl SecretStoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Credential cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds; absent means entries live until invalidated
    #[validate(range(min = 1, message = "Cache expiry must be at least 1 second"))]
    pub expiry_seconds: Option<u64>,
}

impl CacheConfig {
    pub fn expiry(&self) -> Option<Duration> {
        self.expiry_seconds.map(Duration::from_secs)
    }
}

/// PostgreSQL connector settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConnectorConfig {
    pub ssl_mode: String,

    #[validate(length(min = 1, message = "Application name cannot be empty"))]
    pub application_name: String,

    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Lowest accepted `server_version_num`
    pub min_server_version: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            ssl_mode: "prefer".to_string(),
            application_name: crate::APP_NAME.to_string(),
            connect_timeout_seconds: 10,
            min_server_version: DEFAULT_MIN_SERVER_VERSION,
        }
    }
}

impl ConnectorConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Connection pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PoolConfig {
    #[validate(range(
        min = 1,
        max = 100,
        message = "Max connections must be between 1 and 100"
    ))]
    pub max_connections: u32,

    #[validate(range(max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    #[validate(range(
        min = 1,
        max = 300,
        message = "Acquire timeout must be between 1 and 300 seconds"
    ))]
    pub acquire_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub level: String,

    /// Enable JSON structured logging
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_db() -> ConnectionConfig {
        ConnectionConfig {
            host: "db.internal".to_string(),
            port: 5433,
            database: "app".to_string(),
            username: "app_user".to_string(),
            password: SecretString::new("static-password"),
            ..Default::default()
        }
    }

    fn payload() -> CredentialPayload {
        CredentialPayload {
            host: "h1".to_string(),
            port: Some(5432),
            database: Some("app".to_string()),
            username: "u".to_string(),
            password: SecretString::new("p1"),
        }
    }

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, "development");
        assert_eq!(config.connector.min_server_version, 90300);
        assert!(config.cache.expiry().is_none());
    }

    #[test]
    fn test_secret_reference_treats_blank_as_absent() {
        let mut config = static_db();
        assert!(config.secret_reference().is_none());
        assert!(config.secret_request().is_none());

        config.secret_ref = Some("   ".to_string());
        assert!(!config.uses_secret());

        config.secret_ref = Some("db/prod".to_string());
        assert_eq!(config.secret_reference(), Some("db/prod"));
    }

    #[test]
    fn test_secret_request_carries_hints() {
        let config = ConnectionConfig {
            secret_ref: Some("db/prod".to_string()),
            secret_region: Some("eu-west-1".to_string()),
            secret_profile: Some(String::new()),
            ..Default::default()
        };
        let request = config.secret_request().unwrap();
        assert_eq!(request.secret_id, "db/prod");
        assert_eq!(request.region.as_deref(), Some("eu-west-1"));
        assert!(request.profile.is_none());
    }

    #[test]
    fn test_with_credentials_overlays_payload() {
        let config = ConnectionConfig { secret_ref: Some("db/prod".to_string()), ..static_db() };
        let effective = config.with_credentials(&payload());

        assert_eq!(effective.host, "h1");
        assert_eq!(effective.port, 5432);
        assert_eq!(effective.username, "u");
        assert_eq!(effective.password.expose_secret(), "p1");
        assert_eq!(effective.secret_ref.as_deref(), Some("db/prod"));
        // the original is untouched
        assert_eq!(config.host, "db.internal");
    }

    #[test]
    fn test_with_credentials_keeps_configured_port_and_database() {
        let partial = CredentialPayload { port: None, database: None, ..payload() };
        let effective = static_db().with_credentials(&partial);
        assert_eq!(effective.port, 5433);
        assert_eq!(effective.database, "app");
    }

    #[test]
    fn test_display_target_hides_password() {
        let target = static_db().display_target();
        assert_eq!(target, "app_user@db.internal:5433/app");
        assert!(!target.contains("static-password"));
    }

    #[test]
    fn test_aws_secret_alias() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"host":"h","username":"u","aws_secret":"db/prod"}"#).unwrap();
        assert_eq!(config.secret_reference(), Some("db/prod"));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_serialized_config_redacts_password() {
        let json = serde_json::to_string(&static_db()).unwrap();
        assert!(!json.contains("static-password"));
    }

    #[test]
    fn test_database_lookup() {
        let mut config = AppConfig::default();
        config.databases.insert("production".to_string(), static_db());

        assert!(config.database("production").is_ok());
        let err = config.current_database().unwrap_err();
        assert!(err.to_string().contains("'development'"));
        assert!(err.to_string().contains("production"));
    }

    #[test]
    fn test_config_validation_errors() {
        // static config without host
        let mut config = AppConfig::default();
        config
            .databases
            .insert("development".to_string(), ConnectionConfig { host: String::new(), ..static_db() });
        assert!(config.validate().is_err());

        // the same is fine with a secret
        let mut config = AppConfig::default();
        config.databases.insert(
            "development".to_string(),
            ConnectionConfig {
                host: String::new(),
                username: String::new(),
                secret_ref: Some("db/dev".to_string()),
                ..Default::default()
            },
        );
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        config.connector.ssl_mode = "sometimes".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pool.min_connections = 20;
        config.pool.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_ranges() {
        let mut config = AppConfig::default();
        config.pool.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.expiry_seconds = Some(0);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.databases.insert("development".to_string(), ConnectionConfig { port: 0, ..static_db() });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_timeouts() {
        let config = PoolConfig { acquire_timeout_seconds: 15, idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config.acquire_timeout(), Duration::from_secs(15));
        assert_eq!(config.idle_timeout(), None);
    }
}
