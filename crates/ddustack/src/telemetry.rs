//! Log output for binaries built on the client.

use tracing_subscriber::{EnvFilter, fmt};

use crate::DdustackError;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,ddustack=debug";

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`.
///
/// Fails if a global subscriber is already installed or the fallback
/// filter does not parse.
pub fn init_tracing(default_filter: &str) -> Result<(), DdustackError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| DdustackError::Config(format!("log filter {default_filter:?}: {e}")))?,
    };

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| DdustackError::Config(format!("tracing already initialized: {e}")))
}
