//! # Observability Infrastructure
//!
//! Structured logging and metrics for credential resolution and connection
//! retries.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::describe_metrics;

use crate::config::AppConfig;
use crate::errors::Result;

/// Initialize logging and register metric descriptions
pub fn init_observability(config: &AppConfig) -> Result<()> {
    init_logging(&config.logging)?;
    describe_metrics();
    ::tracing::debug!(level = %config.logging.level, json = config.logging.json, "Observability initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_init_observability() {
        let config = AppConfig::default();
        assert!(init_observability(&config).is_ok());
    }
}
