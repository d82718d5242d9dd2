//! # Connectors
//!
//! A [`Connector`] is the persistence layer's plain connection-opening
//! capability: it turns an effective [`ConnectionConfig`] into a live
//! connection and runs the post-connect version check. The
//! [`ConnectionFactory`](super::ConnectionFactory) decorates a connector with
//! credential resolution and the retry policy.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use crate::config::ConnectionConfig;

/// Why a single connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// Server rejected the credentials
    Authentication,
    /// Nothing listening at host:port
    Refused,
    /// DNS, TLS or other transport failure
    Network,
    /// Attempt exceeded the connect timeout
    Timeout,
    /// Connected, but the server failed the version check
    UnsupportedVersion,
    Other,
}

impl fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectErrorKind::Authentication => "authentication",
            ConnectErrorKind::Refused => "refused",
            ConnectErrorKind::Network => "network",
            ConnectErrorKind::Timeout => "timeout",
            ConnectErrorKind::UnsupportedVersion => "unsupported_version",
            ConnectErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Failure of one low-level connection attempt.
#[derive(thiserror::Error, Debug)]
#[error("{kind} error connecting to database: {message}")]
pub struct ConnectError {
    pub kind: ConnectErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConnectError {
    pub fn new(kind: ConnectErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    pub fn with_source(
        kind: ConnectErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { kind, message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ConnectErrorKind::Authentication, message)
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self::new(ConnectErrorKind::Refused, message)
    }

    pub fn is_authentication(&self) -> bool {
        self.kind == ConnectErrorKind::Authentication
    }
}

/// Opens physical connections.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send;

    /// Open a connection using exactly the given configuration.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Connection, ConnectError>;

    /// Validate a freshly opened connection before it is handed out.
    async fn check_version(&self, _connection: &mut Self::Connection) -> Result<(), ConnectError> {
        Ok(())
    }
}

/// Adapts a closure into a [`Connector`] with no version check.
///
/// ```rust,ignore
/// let connector = FnConnector::new(|config: ConnectionConfig| async move {
///     my_driver::connect(&config.host, config.port).await.map_err(to_connect_error)
/// });
/// ```
pub struct FnConnector<F, Fut, C> {
    open: F,
    _marker: PhantomData<fn() -> (Fut, C)>,
}

impl<F, Fut, C> FnConnector<F, Fut, C>
where
    F: Fn(ConnectionConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<C, ConnectError>> + Send,
    C: Send,
{
    pub fn new(open: F) -> Self {
        Self { open, _marker: PhantomData }
    }
}

#[async_trait]
impl<F, Fut, C> Connector for FnConnector<F, Fut, C>
where
    F: Fn(ConnectionConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<C, ConnectError>> + Send,
    C: Send,
{
    type Connection = C;

    async fn connect(&self, config: &ConnectionConfig) -> Result<C, ConnectError> {
        (self.open)(config.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_display() {
        let err = ConnectError::authentication("password authentication failed for user \"u\"");
        assert!(err.is_authentication());
        assert_eq!(
            err.to_string(),
            "authentication error connecting to database: password authentication failed for user \"u\""
        );

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ConnectError::with_source(ConnectErrorKind::Refused, "h1:5432", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_authentication());
    }

    #[tokio::test]
    async fn test_fn_connector_passes_config() {
        let connector = FnConnector::new(|config: ConnectionConfig| async move {
            if config.host == "good" {
                Ok(config.host)
            } else {
                Err(ConnectError::refused(format!("{}:{}", config.host, config.port)))
            }
        });

        let good = ConnectionConfig { host: "good".to_string(), ..Default::default() };
        let mut connection = connector.connect(&good).await.unwrap();
        assert_eq!(connection, "good");
        assert!(connector.check_version(&mut connection).await.is_ok());

        let bad = ConnectionConfig { host: "bad".to_string(), ..Default::default() };
        let err = connector.connect(&bad).await.unwrap_err();
        assert_eq!(err.kind, ConnectErrorKind::Refused);
    }
}
