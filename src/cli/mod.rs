//! # Command Line Interface
//!
//! `credpool` resolves the active environment's credentials and opens
//! connections with them, exercising the same code path applications use.

pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::Connection;
use std::path::PathBuf;

use crate::config::{load_config, AppConfig, ConnectionConfig};
use crate::observability::{init_observability, log_config_info};
use crate::storage::{
    acquire, check_connection, create_pool, get_pool_stats, server_version_num, ConnectionFactory,
    CredentialSource, PgConnector, PoolStats, ResolvedConnection,
};
use output::{print_fields, print_json, OutputFormat};

#[derive(Parser)]
#[command(name = "credpool")]
#[command(about = "Secret-backed PostgreSQL connection tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Deployment environment override
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open one connection and report the server version
    Check {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Print the effective connection target with the password redacted
    Resolve {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Create a connection pool and report its statistics
    Pool {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },
}

/// Effective target as printed by the CLI
#[derive(Debug, Serialize)]
pub struct TargetSummary {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub credentials: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
    pub cache_key: String,
}

impl TargetSummary {
    fn new<C>(factory: &ConnectionFactory<C>, static_config: &ConnectionConfig, resolved: &ResolvedConnection) -> Self {
        Self {
            environment: factory.environment().to_string(),
            host: resolved.config.host.clone(),
            port: resolved.config.port,
            database: resolved.config.database.clone(),
            username: resolved.config.username.clone(),
            credentials: match resolved.source {
                CredentialSource::Static => "static",
                CredentialSource::Secret => "secret",
            },
            secret_ref: static_config.secret_reference().map(str::to_string),
            cache_key: factory.cache_key().to_string(),
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("environment", self.environment.clone()),
            ("target", format!("{}@{}:{}/{}", self.username, self.host, self.port, self.database)),
            ("credentials", self.credentials.to_string()),
        ];
        if let Some(secret_ref) = &self.secret_ref {
            fields.push(("secret_ref", secret_ref.clone()));
            fields.push(("cache_key", self.cache_key.clone()));
        }
        fields
    }
}

#[derive(Serialize)]
struct CheckReport {
    #[serde(flatten)]
    target: TargetSummary,
    server_version_num: u32,
}

#[derive(Serialize)]
struct PoolReport {
    #[serde(flatten)]
    target: TargetSummary,
    size: u32,
    idle: usize,
    active: u32,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.env.as_deref())
        .context("Failed to load configuration")?;
    init_observability(&observability_config(&config, cli.verbose))?;
    log_config_info(&config);

    let factory = ConnectionFactory::from_config(&config, PgConnector::new(config.connector.clone()))?;
    let database = config.current_database()?;

    match cli.command {
        Commands::Check { output } => handle_check(&factory, database, output).await?,
        Commands::Resolve { output } => handle_resolve(&factory, database, output).await?,
        Commands::Pool { output } => handle_pool(&factory, database, &config, output).await?,
    }

    Ok(())
}

/// `--verbose` raises the configured log level to debug
fn observability_config(config: &AppConfig, verbose: bool) -> AppConfig {
    let mut config = config.clone();
    if verbose {
        config.logging.level = "debug".to_string();
    }
    config
}

async fn handle_check(
    factory: &ConnectionFactory<PgConnector>,
    database: &ConnectionConfig,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let mut connection = factory.new_connection(database).await?;
    let version = server_version_num(&mut connection).await?;
    connection.close().await.context("Failed to close connection")?;

    // served from cache after a successful connect
    let resolved = factory.resolve_credentials(database).await?;
    let report = CheckReport { target: TargetSummary::new(factory, database, &resolved), server_version_num: version };

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            let mut fields = report.target.fields();
            fields.push(("server_version_num", report.server_version_num.to_string()));
            print_fields(&fields);
            println!("Connection OK");
        }
    }
    Ok(())
}

async fn handle_resolve(
    factory: &ConnectionFactory<PgConnector>,
    database: &ConnectionConfig,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let resolved = factory.resolve_credentials(database).await?;
    let summary = TargetSummary::new(factory, database, &resolved);

    match output {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => print_fields(&summary.fields()),
    }
    Ok(())
}

async fn handle_pool(
    factory: &ConnectionFactory<PgConnector>,
    database: &ConnectionConfig,
    config: &AppConfig,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let pool = create_pool(factory, database, &config.pool).await?;
    let mut connection = acquire(factory, &pool, database).await?;
    check_connection(&mut connection).await?;
    let stats: PoolStats = get_pool_stats(&pool);
    drop(connection);

    let resolved = factory.resolve_credentials(database).await?;
    let report = PoolReport {
        target: TargetSummary::new(factory, database, &resolved),
        size: stats.size,
        idle: stats.idle,
        active: stats.active(),
    };
    pool.close().await;

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            let mut fields = report.target.fields();
            fields.push(("pool_size", report.size.to_string()));
            fields.push(("idle", report.idle.to_string()));
            fields.push(("active", report.active.to_string()));
            print_fields(&fields);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{CredentialCache, EnvSecretStore, SecretString};
    use clap::CommandFactory;
    use tracing_test::traced_test;
    use std::sync::Arc;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["credpool", "resolve", "--env", "production", "-o", "json"]).unwrap();
        assert_eq!(cli.env.as_deref(), Some("production"));
        assert!(matches!(cli.command, Commands::Resolve { output: OutputFormat::Json }));
    }

    #[traced_test]
    #[test]
    fn test_verbose_raises_log_level() {
        let config = AppConfig::default();
        assert_eq!(observability_config(&config, false).logging.level, "info");

        let verbose = observability_config(&config, true);
        assert_eq!(verbose.logging.level, "debug");
        assert!(init_observability(&verbose).is_ok());
    }

    #[tokio::test]
    async fn test_target_summary_for_static_config() {
        let factory = ConnectionFactory::new(
            "staging",
            Arc::new(EnvSecretStore::new()),
            CredentialCache::new(),
            PgConnector::default(),
        );
        let database = ConnectionConfig {
            host: "db".to_string(),
            database: "app".to_string(),
            username: "app".to_string(),
            password: SecretString::new("hunter2"),
            ..Default::default()
        };

        let resolved = factory.resolve_credentials(&database).await.unwrap();
        let summary = TargetSummary::new(&factory, &database, &resolved);
        assert_eq!(summary.credentials, "static");
        assert_eq!(summary.fields().len(), 3);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("DATABASE_SECRET_FOR_STAGING"));
    }
}
