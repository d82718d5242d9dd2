//! # PostgreSQL Connector
//!
//! [`Connector`] implementation on sqlx. The version check reads
//! `server_version_num` and rejects servers older than
//! `connector.min_server_version`.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};
use std::str::FromStr;

use super::connector::{ConnectError, ConnectErrorKind, Connector};
use crate::config::{ConnectionConfig, ConnectorConfig};

const AUTH_FAILED_SQLSTATES: &[&str] = &["28P01", "28000"];

/// Opens `PgConnection`s.
#[derive(Debug, Clone, Default)]
pub struct PgConnector {
    config: ConnectorConfig,
}

impl PgConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// sqlx connect options for an effective connection configuration
    pub fn connect_options(&self, connection: &ConnectionConfig) -> Result<PgConnectOptions, ConnectError> {
        let ssl_mode = PgSslMode::from_str(&self.config.ssl_mode).map_err(|e| {
            ConnectError::with_source(
                ConnectErrorKind::Other,
                format!("Invalid ssl_mode '{}'", self.config.ssl_mode),
                e,
            )
        })?;

        let mut options = PgConnectOptions::new()
            .host(&connection.host)
            .port(connection.port)
            .username(&connection.username)
            .password(connection.password.expose_secret())
            .ssl_mode(ssl_mode)
            .application_name(&self.config.application_name);

        if !connection.database.is_empty() {
            options = options.database(&connection.database);
        }

        Ok(options)
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgConnection;

    async fn connect(&self, config: &ConnectionConfig) -> Result<PgConnection, ConnectError> {
        let options = self.connect_options(config)?;
        let timeout = self.config.connect_timeout();

        match tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await {
            Ok(Ok(connection)) => Ok(connection),
            Ok(Err(e)) => Err(classify_sqlx_error(e)),
            Err(_) => Err(ConnectError::new(
                ConnectErrorKind::Timeout,
                format!(
                    "No connection to {}:{} within {}s",
                    config.host,
                    config.port,
                    timeout.as_secs()
                ),
            )),
        }
    }

    async fn check_version(&self, connection: &mut PgConnection) -> Result<(), ConnectError> {
        let version = server_version_num(connection).await?;
        if version < self.config.min_server_version {
            return Err(ConnectError::new(
                ConnectErrorKind::UnsupportedVersion,
                format!(
                    "PostgreSQL server version {} is older than the minimum supported {}",
                    version, self.config.min_server_version
                ),
            ));
        }

        tracing::debug!(server_version_num = version, "Server version accepted");
        Ok(())
    }
}

/// The server's `server_version_num`, e.g. `160002` for 16.2
pub async fn server_version_num(connection: &mut PgConnection) -> Result<u32, ConnectError> {
    let raw: String = sqlx::query_scalar("SHOW server_version_num")
        .fetch_one(&mut *connection)
        .await
        .map_err(classify_sqlx_error)?;

    raw.trim().parse().map_err(|_| {
        ConnectError::new(
            ConnectErrorKind::UnsupportedVersion,
            format!("Unrecognised server_version_num '{}'", raw),
        )
    })
}

/// Map a sqlx error from connection setup onto a [`ConnectErrorKind`].
pub fn classify_sqlx_error(err: sqlx::Error) -> ConnectError {
    let (kind, message) = match &err {
        sqlx::Error::Database(db) => {
            let kind = match db.code().as_deref() {
                Some(code) if AUTH_FAILED_SQLSTATES.contains(&code) => ConnectErrorKind::Authentication,
                _ => ConnectErrorKind::Other,
            };
            (kind, db.message().to_string())
        }
        sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            (ConnectErrorKind::Refused, io.to_string())
        }
        sqlx::Error::Io(io) => (ConnectErrorKind::Network, io.to_string()),
        sqlx::Error::Tls(tls) => (ConnectErrorKind::Network, tls.to_string()),
        sqlx::Error::PoolTimedOut => (ConnectErrorKind::Timeout, err.to_string()),
        other => (ConnectErrorKind::Other, other.to_string()),
    };

    ConnectError::with_source(kind, message, err)
}
