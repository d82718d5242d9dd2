//! AWS Secrets Manager secret store
//!
//! Fetches secrets with `GetSecretValue` through the AWS SDK. The secret's
//! `SecretString` must hold the credential JSON document (the format
//! RDS-managed secrets use).
//!
//! ## Credentials and region
//!
//! Clients are built from the SDK's default provider chain, so environment
//! variables, shared config/credentials profiles, SSO, web identity, ECS task
//! roles and EC2 instance profiles all work. A request's `region`/`profile`
//! take precedence over the store configuration; one client is kept per
//! combination.
//!
//! ```rust,ignore
//! use credpool::secrets::{AwsSecretsManagerStore, AwsStoreConfig, SecretRequest, SecretStore};
//!
//! let store = AwsSecretsManagerStore::new(AwsStoreConfig {
//!     region: Some("eu-west-1".to_string()),
//!     ..Default::default()
//! });
//! let credentials = store.fetch_credentials(&SecretRequest::new("db/prod")).await?;
//! ```

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::{Credentials, Region};
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::error::{Result, SecretsError};
use super::store::{SecretRequest, SecretStore, SecretStoreType};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Error codes Secrets Manager returns for rejected or unusable credentials
const AUTHENTICATION_ERROR_CODES: &[&str] = &[
    "AccessDeniedException",
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "ExpiredTokenException",
];

/// Configuration for the AWS Secrets Manager store
#[derive(Debug, Clone)]
pub struct AwsStoreConfig {
    /// Default region when the request does not name one
    pub region: Option<String>,
    /// Default profile when the request does not name one
    pub profile: Option<String>,
    /// Endpoint override (VPC endpoints, LocalStack, tests)
    pub endpoint: Option<String>,
    /// Fixed credentials; replaces the default provider chain when set
    pub credentials: Option<Credentials>,
    /// Whole-operation timeout, retries included
    pub request_timeout: Duration,
    /// SDK attempts per fetch for transient errors
    pub max_attempts: u32,
}

impl Default for AwsStoreConfig {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            endpoint: None,
            credentials: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    region: Option<String>,
    profile: Option<String>,
}

/// AWS Secrets Manager secret store
#[derive(Debug)]
pub struct AwsSecretsManagerStore {
    config: AwsStoreConfig,
    clients: RwLock<HashMap<ClientKey, Client>>,
}

impl AwsSecretsManagerStore {
    /// Create the store. SDK clients are built on first use.
    pub fn new(config: AwsStoreConfig) -> Self {
        Self { config, clients: RwLock::new(HashMap::new()) }
    }

    fn client_key(&self, request: &SecretRequest) -> ClientKey {
        let non_empty = |value: Option<&String>| value.filter(|v| !v.is_empty()).cloned();
        ClientKey {
            region: non_empty(request.region.as_ref()).or_else(|| non_empty(self.config.region.as_ref())),
            profile: non_empty(request.profile.as_ref())
                .or_else(|| non_empty(self.config.profile.as_ref())),
        }
    }

    async fn client_for(&self, request: &SecretRequest) -> Result<Client> {
        let key = self.client_key(request);
        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        let client = self.build_client(&key).await?;
        let mut clients = self.clients.write().await;
        Ok(clients.entry(key).or_insert(client).clone())
    }

    async fn build_client(&self, key: &ClientKey) -> Result<Client> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(self.config.max_attempts.max(1)))
            .timeout_config(
                TimeoutConfig::builder().operation_timeout(self.config.request_timeout).build(),
            );

        if let Some(profile) = &key.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &key.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(credentials) = &self.config.credentials {
            loader = loader.credentials_provider(credentials.clone());
        }

        let shared = loader.load().await;
        let Some(region) = shared.region() else {
            return Err(SecretsError::config_error(
                "No AWS region configured (set secret_region, secret_store.region or AWS_REGION)",
            ));
        };

        info!(
            region = %region,
            profile = key.profile.as_deref().unwrap_or("default"),
            endpoint = ?self.config.endpoint,
            "Initialized AWS Secrets Manager client"
        );
        Ok(Client::new(&shared))
    }

    #[cfg(test)]
    async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Map an SDK failure onto the store error taxonomy.
fn map_sdk_error(secret_id: &str, err: SdkError<GetSecretValueError>) -> SecretsError {
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(service) => {
            let service_err = service.err();
            if service_err.is_resource_not_found_exception() {
                SecretsError::not_found(secret_id)
            } else if service_err.code().is_some_and(|code| AUTHENTICATION_ERROR_CODES.contains(&code)) {
                SecretsError::authentication_failed(detail)
            } else {
                SecretsError::backend_error(detail)
            }
        }
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            SecretsError::connection_failed(format!("Secrets Manager unreachable: {}", detail))
        }
        _ => SecretsError::backend_error(detail),
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    async fn fetch_secret(&self, request: &SecretRequest) -> Result<serde_json::Value> {
        let client = self.client_for(request).await?;
        debug!(secret_id = %request.secret_id, "Fetching secret from AWS Secrets Manager");

        let output = client
            .get_secret_value()
            .secret_id(&request.secret_id)
            .send()
            .await
            .map_err(|e| {
                let err = map_sdk_error(&request.secret_id, e);
                error!(secret_id = %request.secret_id, error = %err, "Secrets Manager request failed");
                err
            })?;

        debug!(
            secret_id = %request.secret_id,
            name = ?output.name(),
            version_id = ?output.version_id(),
            "Fetched secret from AWS Secrets Manager"
        );

        let secret_string = output.secret_string().ok_or_else(|| {
            SecretsError::invalid_value(format!(
                "Secret '{}' has no SecretString (binary secrets are not supported)",
                request.secret_id
            ))
        })?;

        serde_json::from_str(secret_string).map_err(|_| {
            SecretsError::invalid_value(format!(
                "SecretString of '{}' is not a JSON document",
                request.secret_id
            ))
        })
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::AwsSecretsManager
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AwsSecretsManagerStore {
        AwsSecretsManagerStore::new(AwsStoreConfig {
            region: Some("us-east-1".into()),
            endpoint: Some("http://127.0.0.1:4566".into()),
            credentials: Some(Credentials::new("AKIDTEST", "secret", None, None, "test")),
            ..Default::default()
        })
    }

    #[test]
    fn test_request_overrides_configured_region_and_profile() {
        let store = store();

        let key = store.client_key(&SecretRequest::new("db/prod").with_region("eu-west-1").with_profile("ops"));
        assert_eq!(key.region.as_deref(), Some("eu-west-1"));
        assert_eq!(key.profile.as_deref(), Some("ops"));

        let key = store.client_key(&SecretRequest::new("db/prod"));
        assert_eq!(key.region.as_deref(), Some("us-east-1"));
        assert_eq!(key.profile, None);
    }

    #[test]
    fn test_empty_overrides_are_ignored() {
        let key = store().client_key(&SecretRequest::new("db/prod").with_region(""));
        assert_eq!(key.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_default_config() {
        let config = AwsStoreConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 3);
        assert!(config.credentials.is_none());
    }

    #[tokio::test]
    async fn test_clients_are_reused_per_region() {
        let store = store();

        store.client_for(&SecretRequest::new("a")).await.unwrap();
        store.client_for(&SecretRequest::new("b")).await.unwrap();
        assert_eq!(store.client_count().await, 1);

        store.client_for(&SecretRequest::new("a").with_region("eu-west-1")).await.unwrap();
        assert_eq!(store.client_count().await, 2);
    }
}
