//! Vault secret store
//!
//! Reads credential documents from a HashiCorp Vault KV v2 engine. The secret
//! id is the path within the mount; the stored keys are the credential fields
//! (`host`, `port`, `dbname`, `username`, `password`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::error::{Result, SecretsError};
use super::store::{SecretRequest, SecretStore, SecretStoreType};

/// Configuration for the Vault store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStoreConfig {
    /// Vault server address
    pub address: String,
    /// Vault authentication token
    pub token: Option<String>,
    /// Vault namespace (for Enterprise)
    pub namespace: Option<String>,
    /// KV v2 mount path (default: "secret")
    #[serde(default = "default_kv_mount")]
    pub kv_mount_path: String,
}

pub(crate) fn default_kv_mount() -> String {
    "secret".to_string()
}

impl VaultStoreConfig {
    /// Fill unset fields from `VAULT_ADDR`, `VAULT_TOKEN` and `VAULT_NAMESPACE`.
    pub fn with_env_fallback(
        address: Option<String>,
        token: Option<String>,
        namespace: Option<String>,
        kv_mount_path: Option<String>,
    ) -> Result<Self> {
        let address = address.or_else(|| std::env::var("VAULT_ADDR").ok()).ok_or_else(|| {
            SecretsError::config_error("Vault address not configured (set VAULT_ADDR)")
        })?;
        let token = token.or_else(|| std::env::var("VAULT_TOKEN").ok());
        let namespace = namespace.or_else(|| std::env::var("VAULT_NAMESPACE").ok());

        Ok(Self {
            address,
            token,
            namespace,
            kv_mount_path: kv_mount_path.unwrap_or_else(default_kv_mount),
        })
    }
}

/// HashiCorp Vault secret store
pub struct VaultSecretStore {
    client: VaultClient,
    kv_mount_path: String,
}

impl std::fmt::Debug for VaultSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretStore")
            .field("kv_mount_path", &self.kv_mount_path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultSecretStore {
    pub fn new(config: VaultStoreConfig) -> Result<Self> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token);
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::config_error(format!("Failed to create Vault client: {}", e))
        })?;

        info!(address = %config.address, kv_mount = %config.kv_mount_path, "Initialized Vault secret store");

        Ok(Self { client, kv_mount_path: config.kv_mount_path })
    }
}

fn map_vault_error(secret_id: &str, error: ClientError) -> SecretsError {
    match error {
        ClientError::APIError { code: 404, .. } => SecretsError::not_found(secret_id),
        ClientError::APIError { code: 401 | 403, errors } => SecretsError::authentication_failed(
            format!("Vault denied access to '{}': {}", secret_id, errors.join(", ")),
        ),
        ClientError::RestClientError { source } => {
            SecretsError::connection_failed(format!("Vault unreachable: {}", source))
        }
        other => SecretsError::backend_error(format!("Vault read of '{}' failed: {}", secret_id, other)),
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn fetch_secret(&self, request: &SecretRequest) -> Result<serde_json::Value> {
        debug!(
            secret_id = %request.secret_id,
            kv_mount = %self.kv_mount_path,
            "Fetching secret from Vault"
        );

        let data: HashMap<String, serde_json::Value> =
            kv2::read(&self.client, &self.kv_mount_path, &request.secret_id).await.map_err(|e| {
                error!(secret_id = %request.secret_id, error = %e, "Failed to fetch secret from Vault");
                map_vault_error(&request.secret_id, e)
            })?;

        Ok(serde_json::Value::Object(data.into_iter().collect()))
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::Vault
    }
}
