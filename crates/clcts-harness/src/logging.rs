use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, HarnessError};

/// Install the global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) -> Result<(), HarnessError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|_| ConfigError::InvalidLogLevel(level.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| HarnessError::Logging(e.to_string()))
}
