//! # Storage and Persistence
//!
//! Connection establishment for PostgreSQL with secret-backed credentials.

pub mod connector;
pub mod factory;
pub mod pool;
pub mod postgres;

pub use connector::{ConnectError, ConnectErrorKind, Connector, FnConnector};
pub use factory::{ConnectionFactory, CredentialSource, ResolvedConnection, MAX_CONNECT_ATTEMPTS};
pub use pool::{acquire, check_connection, create_pool, get_pool_stats, refresh_pool_credentials, DbPool, PoolStats};
pub use postgres::{classify_sqlx_error, server_version_num, PgConnector};
