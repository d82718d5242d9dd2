//! Environment variable secret store.
//!
//! Intended for **development and testing only**. Secrets are read from
//! environment variables holding the credential JSON document:
//!
//! ```bash
//! export CREDPOOL_SECRET_DB_PROD='{"host":"localhost","port":5432,"dbname":"app","username":"app","password":"dev"}'
//! ```
//!
//! The secret id is upper-cased and every character outside `[A-Z0-9]` is
//! replaced with `_`, so `db/prod` reads `CREDPOOL_SECRET_DB_PROD`.
//!
//! # Security Warning
//!
//! Environment variables are visible in process listings and carry no audit
//! trail. Use AWS Secrets Manager or Vault in production.

use async_trait::async_trait;
use std::env;
use tracing::debug;

use super::error::{Result, SecretsError};
use super::store::{SecretRequest, SecretStore, SecretStoreType};

/// Default environment variable prefix for secrets.
pub const DEFAULT_SECRET_PREFIX: &str = "CREDPOOL_SECRET_";

/// Environment variable secret store (development only).
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self { prefix: DEFAULT_SECRET_PREFIX.to_string() }
    }
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Converts a secret id to the environment variable name.
    fn secret_id_to_env_var(&self, secret_id: &str) -> String {
        let suffix: String = secret_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch_secret(&self, request: &SecretRequest) -> Result<serde_json::Value> {
        let env_var = self.secret_id_to_env_var(&request.secret_id);
        debug!(secret_id = %request.secret_id, env_var = %env_var, "Reading secret from environment");

        let raw = env::var(&env_var).map_err(|_| {
            SecretsError::not_found(format!(
                "{} (looking for environment variable {})",
                request.secret_id, env_var
            ))
        })?;

        serde_json::from_str(&raw).map_err(|_| {
            SecretsError::invalid_value(format!("{} does not contain a JSON document", env_var))
        })
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::Env
    }
}
