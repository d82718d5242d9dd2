//! # Error Handling
//!
//! Error types for credpool. Secret store failures keep their own
//! [`SecretsError`](crate::secrets::SecretsError) and single connection
//! attempts report a [`ConnectError`](crate::storage::ConnectError); both are
//! wrapped by [`CredpoolError`] at the public API.

pub mod types;

pub use types::{CredpoolError, Result};
