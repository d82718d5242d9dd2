//! Secret store trait and types
//!
//! Defines the read-only interface every credential source implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::Result;
use super::payload::CredentialPayload;

/// Type of secret store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecretStoreType {
    /// AWS Secrets Manager
    #[default]
    #[serde(alias = "aws")]
    AwsSecretsManager,
    /// HashiCorp Vault KV v2
    Vault,
    /// Process environment (development only)
    Env,
}

impl SecretStoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwsSecretsManager => "aws_secrets_manager",
            Self::Vault => "vault",
            Self::Env => "env",
        }
    }
}

impl FromStr for SecretStoreType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "aws_secrets_manager" | "aws" => Ok(Self::AwsSecretsManager),
            "vault" => Ok(Self::Vault),
            "env" => Ok(Self::Env),
            _ => Err(format!("Unknown secret store type: {}", s)),
        }
    }
}

impl fmt::Display for SecretStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request for one secret.
///
/// `region` and `profile` are hints for stores that are partitioned that way
/// (AWS); other stores ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRequest {
    pub secret_id: String,
    pub region: Option<String>,
    pub profile: Option<String>,
}

impl SecretRequest {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self { secret_id: secret_id.into(), region: None, profile: None }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

/// Trait for secret stores.
///
/// Implementations are read-only and must never log secret values. Failures
/// (network, not found, access denied) are returned as-is; retrying is the
/// concern of the store's own client, not of the callers.
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Fetch the JSON document stored under `request.secret_id`.
    async fn fetch_secret(&self, request: &SecretRequest) -> Result<serde_json::Value>;

    /// Get the store type identifier
    fn store_type(&self) -> SecretStoreType;

    /// Fetch a secret and decode it as database credentials.
    async fn fetch_credentials(&self, request: &SecretRequest) -> Result<CredentialPayload> {
        let value = self.fetch_secret(request).await?;
        CredentialPayload::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_type_roundtrip() {
        for st in [SecretStoreType::AwsSecretsManager, SecretStoreType::Vault, SecretStoreType::Env]
        {
            let parsed: SecretStoreType = st.as_str().parse().unwrap();
            assert_eq!(st, parsed);
        }
        assert_eq!("aws".parse::<SecretStoreType>().unwrap(), SecretStoreType::AwsSecretsManager);
        assert!("gcp".parse::<SecretStoreType>().is_err());
    }

    #[test]
    fn test_store_type_serialization() {
        let json = serde_json::to_string(&SecretStoreType::AwsSecretsManager).unwrap();
        assert_eq!(json, "\"aws_secrets_manager\"");

        let parsed: SecretStoreType = serde_json::from_str("\"vault\"").unwrap();
        assert_eq!(parsed, SecretStoreType::Vault);
    }

    #[test]
    fn test_secret_request_builder() {
        let request = SecretRequest::new("db/prod").with_region("eu-west-1").with_profile("ops");
        assert_eq!(request.secret_id, "db/prod");
        assert_eq!(request.region.as_deref(), Some("eu-west-1"));
        assert_eq!(request.profile.as_deref(), Some("ops"));
    }
}
