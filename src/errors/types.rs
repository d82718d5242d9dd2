//! # Error Types
//!
//! Crate-level error type for credpool using `thiserror`.

use crate::secrets::SecretsError;
use crate::storage::ConnectError;

/// Custom result type for credpool operations
pub type Result<T> = std::result::Result<T, CredpoolError>;

/// Main error type for credpool
#[derive(thiserror::Error, Debug)]
pub enum CredpoolError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Credentials could not be fetched from the secret store. Never retried.
    #[error("Failed to fetch secret '{secret_id}': {source}")]
    SecretFetch {
        secret_id: String,
        #[source]
        source: SecretsError,
    },

    /// A single connection attempt failed and no retry applied
    #[error("Connection failed: {0}")]
    Connect(#[from] ConnectError),

    /// Every permitted connection attempt failed
    #[error("Connection failed after {attempts} attempts: {source}")]
    ConnectionExhausted {
        attempts: u32,
        #[source]
        source: ConnectError,
    },

    /// Database errors outside connection establishment
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CredpoolError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a secret fetch error
    pub fn secret_fetch<S: Into<String>>(secret_id: S, source: SecretsError) -> Self {
        Self::SecretFetch { secret_id: secret_id.into(), source }
    }

    /// Create the fatal error raised once all attempts are used up
    pub fn connection_exhausted(attempts: u32, source: ConnectError) -> Self {
        Self::ConnectionExhausted { attempts, source }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Wrap a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// The underlying connect failure, if this error came from connecting
    pub fn connect_error(&self) -> Option<&ConnectError> {
        match self {
            CredpoolError::Connect(err) => Some(err),
            CredpoolError::ConnectionExhausted { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Check if the caller may reasonably try the whole operation again later
    pub fn is_retryable(&self) -> bool {
        match self {
            CredpoolError::Database { .. } => true,
            CredpoolError::Io { .. } => true,
            CredpoolError::Connect(_) => true,
            CredpoolError::ConnectionExhausted { .. } => true,
            CredpoolError::SecretFetch { source, .. } => matches!(
                source,
                SecretsError::ConnectionFailed { .. } | SecretsError::HttpError(_)
            ),
            _ => false,
        }
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for CredpoolError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for CredpoolError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for CredpoolError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for CredpoolError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<SecretsError> for CredpoolError {
    fn from(error: SecretsError) -> Self {
        match error {
            SecretsError::ConfigError { message } => Self::config(message),
            other => Self::SecretFetch { secret_id: String::new(), source: other },
        }
    }
}

impl From<validator::ValidationErrors> for CredpoolError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
