//! Tracing setup for the node binaries

use tracing_subscriber::EnvFilter;

use rover_core::{RoverError, RoverResult};

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins over `default_filter` when set. Fails if a subscriber
/// is already installed or the filter does not parse.
pub fn init_tracing(default_filter: &str) -> RoverResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| RoverError::Config(format!("log filter '{}': {}", default_filter, e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| RoverError::Config(e.to_string()))
}
