//! Secret stores and the credential cache.
//!
//! Database credentials can live outside the static configuration, in an
//! external secret store. This module provides:
//!
//! - [`SecretStore`]: the read-only interface every store implements, plus
//!   [`SecretRequest`] (secret id with optional region/profile hints)
//! - [`CredentialPayload`]: the decoded `host`/`port`/`dbname`/`username`/
//!   `password` document
//! - [`CredentialCache`]: compute-if-absent cache keyed by deployment
//!   environment, with explicit invalidation
//!
//! # Supported Stores
//!
//! - **AWS Secrets Manager** (`aws` feature): `GetSecretValue` via the AWS SDK
//! - **HashiCorp Vault** (`vault` feature): KV v2 engine
//! - **Environment Variables**: development fallback using `CREDPOOL_SECRET_*`
//!
//! # Example
//!
//! ```rust,ignore
//! use credpool::secrets::{CacheKey, CredentialCache, EnvSecretStore, SecretRequest, SecretStore};
//!
//! let store = EnvSecretStore::new();
//! let cache = CredentialCache::new();
//! let key = CacheKey::for_environment("production");
//!
//! let request = SecretRequest::new("db/prod");
//! let credentials = cache.get_or_fetch(&key, || store.fetch_credentials(&request)).await?;
//! ```
//!
//! # Security Considerations
//!
//! - Passwords are held in [`SecretString`] and never logged or serialized
//! - Cached credentials live in memory only and are dropped on invalidation

#[cfg(feature = "aws")]
pub mod aws;
pub mod cache;
pub mod env;
pub mod error;
pub mod payload;
pub mod registry;
pub mod store;
pub mod types;
#[cfg(feature = "vault")]
pub mod vault;

pub use cache::{CacheKey, CredentialCache};
pub use env::EnvSecretStore;
pub use error::{Result, SecretsError};
pub use payload::CredentialPayload;
pub use registry::build_secret_store;
pub use store::{SecretRequest, SecretStore, SecretStoreType};
pub use types::SecretString;

#[cfg(feature = "aws")]
pub use aws::{AwsSecretsManagerStore, AwsStoreConfig};
#[cfg(feature = "vault")]
pub use vault::{VaultSecretStore, VaultStoreConfig};
