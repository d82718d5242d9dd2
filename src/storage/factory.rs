//! # Connection Factory
//!
//! Opens connections with credentials resolved from a secret store.
//!
//! For a configuration carrying a secret reference the factory:
//!
//! 1. resolves credentials through the [`CredentialCache`] (fetching from the
//!    [`SecretStore`] on a miss) and lays them over the static settings
//! 2. connects and runs the connector's version check
//! 3. on failure invalidates the cached entry, fetches fresh credentials
//!    straight from the store and tries once more
//!
//! Fresh credentials are cached only when the retry connects, so a failed
//! retry leaves the cache empty. Configurations without a secret reference
//! connect once with their own values and never touch the store.
//!
//! ```rust,ignore
//! let factory = ConnectionFactory::new("production", store, CredentialCache::new(), connector);
//! let connection = factory.new_connection(config.current_database()?).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

use super::connector::{ConnectError, Connector};
use crate::config::{AppConfig, ConnectionConfig};
use crate::errors::{CredpoolError, Result};
use crate::observability::metrics;
use crate::secrets::{
    build_secret_store, CacheKey, CredentialCache, CredentialPayload, SecretRequest, SecretStore,
};

/// First attempt plus one retry with refreshed credentials
pub const MAX_CONNECT_ATTEMPTS: u32 = 2;

/// Where the credentials of an effective configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The configuration's own values
    Static,
    /// A secret store payload, possibly served from cache
    Secret,
}

/// Connection settings after credential resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub config: ConnectionConfig,
    pub source: CredentialSource,
}

/// Credential-resolving, retrying connection factory.
pub struct ConnectionFactory<C> {
    environment: String,
    cache_key: CacheKey,
    store: Arc<dyn SecretStore>,
    cache: CredentialCache,
    connector: C,
}

impl<C> std::fmt::Debug for ConnectionFactory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("environment", &self.environment)
            .field("cache_key", &self.cache_key)
            .field("store", &self.store.store_type())
            .finish_non_exhaustive()
    }
}

impl<C> ConnectionFactory<C> {
    /// Create a factory for one deployment environment.
    ///
    /// The cache may be shared with other factories; entries are keyed by
    /// environment.
    pub fn new(
        environment: impl Into<String>,
        store: Arc<dyn SecretStore>,
        cache: CredentialCache,
        connector: C,
    ) -> Self {
        let environment = environment.into();
        let cache_key = CacheKey::for_environment(&environment);
        Self { environment, cache_key, store, cache, connector }
    }

    /// Build the configured secret store and a fresh cache for the active
    /// environment.
    pub fn from_config(config: &AppConfig, connector: C) -> Result<Self> {
        let store = build_secret_store(&config.secret_store)?;
        let cache = CredentialCache::with_expiry(config.cache.expiry());
        Ok(Self::new(config.environment.clone(), store, cache, connector))
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.cache_key
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Effective settings for `config`, using cached credentials when present.
    pub async fn resolve_credentials(&self, config: &ConnectionConfig) -> Result<ResolvedConnection> {
        let Some(request) = config.secret_request() else {
            return Ok(ResolvedConnection { config: config.clone(), source: CredentialSource::Static });
        };

        let credentials = self.cached_or_fetch(&request).await?;
        Ok(ResolvedConnection {
            config: config.with_credentials(&credentials),
            source: CredentialSource::Secret,
        })
    }

    /// Drop cached credentials, fetch fresh ones and cache them.
    ///
    /// Used after a rotation is known to have happened, for example before
    /// swapping a pool's connect options.
    pub async fn refresh_credentials(&self, config: &ConnectionConfig) -> Result<ResolvedConnection> {
        let Some(request) = config.secret_request() else {
            return Ok(ResolvedConnection { config: config.clone(), source: CredentialSource::Static });
        };

        self.cache.invalidate(&self.cache_key).await;
        let credentials = self.fetch(&request).await?;
        self.cache.insert(&self.cache_key, credentials.clone()).await;
        info!(
            environment = %self.environment,
            secret_id = %request.secret_id,
            "Refreshed credentials from secret store"
        );

        Ok(ResolvedConnection {
            config: config.with_credentials(&credentials),
            source: CredentialSource::Secret,
        })
    }

    /// Run `open` with resolved credentials under the retry policy.
    ///
    /// `open` receives the effective configuration and returns a connection
    /// (or anything else built from one, such as a pool). Secret fetch errors
    /// are returned immediately. A connect failure is retried once, with
    /// refreshed credentials, only when the credentials came from a secret.
    pub async fn establish<T, F, Fut>(&self, config: &ConnectionConfig, open: F) -> Result<T>
    where
        F: Fn(ConnectionConfig) -> Fut,
        Fut: Future<Output = std::result::Result<T, ConnectError>>,
    {
        let span = crate::connect_span!(self.environment);
        self.establish_inner(config, open).instrument(span).await
    }

    async fn establish_inner<T, F, Fut>(&self, config: &ConnectionConfig, open: F) -> Result<T>
    where
        F: Fn(ConnectionConfig) -> Fut,
        Fut: Future<Output = std::result::Result<T, ConnectError>>,
    {
        let Some(request) = config.secret_request() else {
            debug!(target_db = %config.display_target(), "No secret reference, connecting with static configuration");
            return match open(config.clone()).await {
                Ok(connection) => {
                    debug!(target_db = %config.display_target(), "Connected");
                    Ok(connection)
                }
                Err(err) => {
                    warn!(target_db = %config.display_target(), kind = %err.kind, error = %err, "Connection failed");
                    metrics::record_connect_failure(&self.environment, &err.kind.to_string());
                    Err(CredpoolError::Connect(err))
                }
            };
        };

        debug!(secret_id = %request.secret_id, state = "resolving_credentials", "Resolving credentials");
        let mut credentials = self.cached_or_fetch(&request).await?;
        let mut attempt = 1;

        loop {
            let effective = config.with_credentials(&credentials);
            debug!(attempt, target_db = %effective.display_target(), state = "connecting", "Connecting");

            match open(effective.clone()).await {
                Ok(connection) => {
                    if attempt > 1 {
                        self.cache.insert(&self.cache_key, credentials).await;
                    }
                    info!(attempt, target_db = %effective.display_target(), state = "connected", "Connected");
                    return Ok(connection);
                }
                Err(err) if attempt < MAX_CONNECT_ATTEMPTS => {
                    warn!(
                        attempt,
                        kind = %err.kind,
                        error = %err,
                        state = "invalidating_cache",
                        "Connection failed, invalidating cached credentials"
                    );
                    self.cache.invalidate(&self.cache_key).await;
                    metrics::record_connect_retry(&self.environment);

                    debug!(secret_id = %request.secret_id, state = "resolving_credentials", "Fetching fresh credentials");
                    credentials = self.fetch(&request).await?;
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        attempt,
                        kind = %err.kind,
                        error = %err,
                        state = "fatal_failed",
                        "Connection failed with refreshed credentials"
                    );
                    metrics::record_connect_failure(&self.environment, &err.kind.to_string());
                    return Err(CredpoolError::connection_exhausted(attempt, err));
                }
            }
        }
    }

    async fn cached_or_fetch(&self, request: &SecretRequest) -> Result<CredentialPayload> {
        self.cache.get_or_fetch(&self.cache_key, || self.fetch(request)).await
    }

    async fn fetch(&self, request: &SecretRequest) -> Result<CredentialPayload> {
        let backend = self.store.store_type();
        debug!(secret_id = %request.secret_id, backend = %backend, "Fetching credentials from secret store");

        match self.store.fetch_credentials(request).await {
            Ok(credentials) => {
                metrics::record_secret_fetch(backend.as_str(), true);
                Ok(credentials)
            }
            Err(err) => {
                metrics::record_secret_fetch(backend.as_str(), false);
                error!(secret_id = %request.secret_id, backend = %backend, error = %err, "Secret fetch failed");
                Err(CredpoolError::secret_fetch(request.secret_id.clone(), err))
            }
        }
    }
}

impl<C: Connector> ConnectionFactory<C> {
    /// Open one connection through the connector, with credential resolution,
    /// the version check and the single retry.
    pub async fn new_connection(&self, config: &ConnectionConfig) -> Result<C::Connection> {
        self.establish(config, move |effective| async move {
            let mut connection = self.connector.connect(&effective).await?;
            self.connector.check_version(&mut connection).await?;
            Ok(connection)
        })
        .await
    }
}
