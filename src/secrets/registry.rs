//! Secret store selection
//!
//! Builds the configured [`SecretStore`] implementation.

use std::sync::Arc;
use tracing::info;

use super::env::EnvSecretStore;
use super::error::Result;
use super::store::{SecretStore, SecretStoreType};
use crate::config::SecretStoreConfig;

/// Build the secret store named by `config.backend`.
///
/// Backends compiled out by feature flags yield a configuration error.
pub fn build_secret_store(config: &SecretStoreConfig) -> Result<Arc<dyn SecretStore>> {
    let store: Arc<dyn SecretStore> = match config.backend {
        SecretStoreType::AwsSecretsManager => build_aws(config)?,
        SecretStoreType::Vault => build_vault(config)?,
        SecretStoreType::Env => Arc::new(match &config.env_prefix {
            Some(prefix) => EnvSecretStore::with_prefix(prefix.clone()),
            None => EnvSecretStore::new(),
        }),
    };

    info!(backend = %store.store_type(), "Secret store initialized");
    Ok(store)
}

#[cfg(feature = "aws")]
fn build_aws(config: &SecretStoreConfig) -> Result<Arc<dyn SecretStore>> {
    use super::aws::{AwsSecretsManagerStore, AwsStoreConfig};

    let store = AwsSecretsManagerStore::new(AwsStoreConfig {
        region: config.region.clone(),
        profile: config.profile.clone(),
        endpoint: config.endpoint.clone(),
        request_timeout: config.request_timeout(),
        ..Default::default()
    });
    Ok(Arc::new(store))
}

#[cfg(not(feature = "aws"))]
fn build_aws(_config: &SecretStoreConfig) -> Result<Arc<dyn SecretStore>> {
    Err(super::error::SecretsError::config_error("credpool was built without the 'aws' feature"))
}

#[cfg(feature = "vault")]
fn build_vault(config: &SecretStoreConfig) -> Result<Arc<dyn SecretStore>> {
    use super::vault::{VaultSecretStore, VaultStoreConfig};

    let vault_config = VaultStoreConfig::with_env_fallback(
        config.vault_address.clone(),
        config.vault_token.as_ref().map(|t| t.expose_secret().to_string()),
        config.vault_namespace.clone(),
        config.vault_mount.clone(),
    )?;
    Ok(Arc::new(VaultSecretStore::new(vault_config)?))
}

#[cfg(not(feature = "vault"))]
fn build_vault(_config: &SecretStoreConfig) -> Result<Arc<dyn SecretStore>> {
    Err(super::error::SecretsError::config_error("credpool was built without the 'vault' feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_env_store() {
        let config = SecretStoreConfig { backend: SecretStoreType::Env, ..Default::default() };
        let store = build_secret_store(&config).unwrap();
        assert_eq!(store.store_type(), SecretStoreType::Env);
    }

    #[cfg(feature = "aws")]
    #[test]
    fn test_build_aws_store() {
        let config = SecretStoreConfig {
            backend: SecretStoreType::AwsSecretsManager,
            region: Some("us-east-1".to_string()),
            ..Default::default()
        };
        let store = build_secret_store(&config).unwrap();
        assert_eq!(store.store_type(), SecretStoreType::AwsSecretsManager);
    }

    #[cfg(feature = "vault")]
    #[test]
    fn test_build_vault_store() {
        let config = SecretStoreConfig {
            backend: SecretStoreType::Vault,
            vault_address: Some("http://127.0.0.1:8200".to_string()),
            ..Default::default()
        };
        let store = build_secret_store(&config).unwrap();
        assert_eq!(store.store_type(), SecretStoreType::Vault);
    }
}
