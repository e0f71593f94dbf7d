use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{SdkError, SdkResult};

/// Install the global `tracing` subscriber. `RUST_LOG`, when set, overrides
/// the configured level. Fails if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> SdkResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| SdkError::Logging(format!("bad level {:?}: {e}", config.level)))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .compact()
        .try_init()
        .map_err(|e| SdkError::Logging(e.to_string()))
}
