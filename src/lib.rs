//! # credpool
//!
//! Secret-backed PostgreSQL connections. Database credentials are resolved
//! lazily from an external secret store, cached per deployment environment,
//! and refreshed once when a connection attempt fails, which lets
//! applications survive password rotation without a restart.
//!
//! ## Architecture
//!
//! ```text
//! ConnectionFactory ──► CredentialCache ──► SecretStore (AWS Secrets Manager | Vault | env)
//!        │
//!        └──► Connector (sqlx PgConnection / PgPool)
//! ```
//!
//! - **secrets**: the [`SecretStore`](secrets::SecretStore) capability, store
//!   implementations and the [`CredentialCache`](secrets::CredentialCache)
//! - **storage**: the [`ConnectionFactory`](storage::ConnectionFactory) retry
//!   policy, the PostgreSQL connector and secret-backed pools
//! - **config**: file and environment configuration
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use credpool::config::load_config;
//! use credpool::storage::{ConnectionFactory, PgConnector};
//!
//! #[tokio::main]
//! async fn main() -> credpool::Result<()> {
//!     let config = load_config(None, None)?;
//!     let factory = ConnectionFactory::from_config(&config, PgConnector::new(config.connector.clone()))?;
//!     let _connection = factory.new_connection(config.current_database()?).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod storage;

// Re-export commonly used types and traits
pub use config::{AppConfig, ConnectionConfig};
pub use errors::{CredpoolError, Result};
pub use secrets::{CacheKey, CredentialCache, CredentialPayload, SecretStore};
pub use storage::{ConnectError, ConnectionFactory, Connector, PgConnector};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "credpool");
    }
}
