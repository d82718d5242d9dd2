//! # Database Connection Pool Management
//!
//! sqlx pools whose credentials come from the connection factory. Creating a
//! pool goes through the same resolve/connect/retry policy as a single
//! connection. Connections taken with [`acquire`] keep that policy for the
//! pool's lifetime: when the server rejects the pool's credentials, the
//! cached secret is refreshed, the pool's connect options are swapped
//! ([`refresh_pool_credentials`]) and the acquire is retried once.

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::future::Future;
use tracing::{error, warn};

use super::connector::{ConnectError, ConnectErrorKind, Connector};
use super::factory::{ConnectionFactory, MAX_CONNECT_ATTEMPTS};
use super::postgres::{classify_sqlx_error, PgConnector};
use crate::config::{ConnectionConfig, PoolConfig};
use crate::errors::{CredpoolError, Result};
use crate::observability::metrics;

/// Type alias for the database connection pool
pub type DbPool = Pool<Postgres>;

/// Create a connection pool for `database` with credentials resolved by
/// `factory`.
pub async fn create_pool(
    factory: &ConnectionFactory<PgConnector>,
    database: &ConnectionConfig,
    config: &PoolConfig,
) -> Result<DbPool> {
    validate_config(config)?;

    let connector = factory.connector();
    let pool = factory
        .establish(database, move |effective| async move {
            let options = connector.connect_options(&effective)?;
            let pool = pool_options(config)
                .connect_with(options)
                .await
                .map_err(classify_sqlx_error)?;

            let mut connection = pool.acquire().await.map_err(classify_sqlx_error)?;
            connector.check_version(&mut *connection).await?;
            drop(connection);
            Ok(pool)
        })
        .await?;

    tracing::info!(
        environment = %factory.environment(),
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_ms = config.acquire_timeout().as_millis(),
        idle_timeout_ms = config.idle_timeout().map(|d| d.as_millis()),
        "Database connection pool created"
    );

    Ok(pool)
}

/// Re-fetch credentials and point the pool's future connections at them.
///
/// Connections already open are not closed.
pub async fn refresh_pool_credentials(
    factory: &ConnectionFactory<PgConnector>,
    pool: &DbPool,
    database: &ConnectionConfig,
) -> Result<()> {
    let resolved = factory.refresh_credentials(database).await?;
    let options = factory.connector().connect_options(&resolved.config)?;
    pool.set_connect_options(options);

    tracing::info!(
        environment = %factory.environment(),
        target_db = %resolved.config.display_target(),
        "Pool connect options updated with refreshed credentials"
    );
    Ok(())
}

/// Acquire a connection from `pool`.
///
/// An authentication or refused error while the pool opens a connection for
/// a secret-backed `database` refreshes the credentials and retries once.
pub async fn acquire(
    factory: &ConnectionFactory<PgConnector>,
    pool: &DbPool,
    database: &ConnectionConfig,
) -> Result<PoolConnection<Postgres>> {
    acquire_with_refresh(
        factory.environment(),
        database.uses_secret(),
        || async { pool.acquire().await.map_err(classify_sqlx_error) },
        || refresh_pool_credentials(factory, pool, database),
    )
    .await
}

async fn acquire_with_refresh<T, A, AFut, R, RFut>(
    environment: &str,
    uses_secret: bool,
    acquire: A,
    refresh: R,
) -> Result<T>
where
    A: Fn() -> AFut,
    AFut: Future<Output = std::result::Result<T, ConnectError>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<()>>,
{
    let err = match acquire().await {
        Ok(connection) => return Ok(connection),
        Err(err) => err,
    };

    if !uses_secret || !rejects_credentials(&err) {
        metrics::record_connect_failure(environment, &err.kind.to_string());
        return Err(CredpoolError::Connect(err));
    }

    warn!(
        environment,
        kind = %err.kind,
        error = %err,
        state = "invalidating_cache",
        "Pool connection rejected, refreshing credentials"
    );
    metrics::record_connect_retry(environment);
    refresh().await?;

    acquire().await.map_err(|err| {
        error!(
            environment,
            kind = %err.kind,
            error = %err,
            state = "fatal_failed",
            "Pool connection failed with refreshed credentials"
        );
        metrics::record_connect_failure(environment, &err.kind.to_string());
        CredpoolError::connection_exhausted(MAX_CONNECT_ATTEMPTS, err)
    })
}

fn rejects_credentials(err: &ConnectError) -> bool {
    err.is_authentication() || err.kind == ConnectErrorKind::Refused
}

/// Check database connectivity
pub async fn check_connection(connection: &mut PgConnection) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(connection)
        .await
        .map_err(|e| CredpoolError::database(e, "Database connectivity check failed"))?;

    Ok(())
}

fn pool_options(config: &PoolConfig) -> PgPoolOptions {
    let options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .test_before_acquire(true);

    if let Some(idle_timeout) = config.idle_timeout() {
        options.idle_timeout(idle_timeout)
    } else {
        options
    }
}

/// Validate pool configuration
fn validate_config(config: &PoolConfig) -> Result<()> {
    if config.max_connections == 0 {
        return Err(CredpoolError::validation("max_connections must be greater than 0"));
    }

    if config.min_connections > config.max_connections {
        return Err(CredpoolError::validation(
            "min_connections cannot be greater than max_connections",
        ));
    }

    Ok(())
}

/// Get pool statistics for monitoring
pub fn get_pool_stats(pool: &DbPool) -> PoolStats {
    PoolStats { size: pool.size(), idle: pool.num_idle() }
}

/// Pool statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Total connections in the pool
    pub size: u32,
    /// Number of idle connections
    pub idle: usize,
}

impl PoolStats {
    /// Get the number of active connections
    pub fn active(&self) -> u32 {
        self.size.saturating_sub(self.idle as u32)
    }

    /// Check if the pool is healthy (has available connections)
    pub fn is_healthy(&self) -> bool {
        self.size > 0
    }
}
