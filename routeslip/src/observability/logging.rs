//! Structured logging setup on top of `tracing-subscriber`.
//!
//! `RUST_LOG` overrides the configured level when set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::{Result, RouteSlipError};

/// Builds the filter for the configured level, honouring `RUST_LOG`.
///
/// # Errors
///
/// Returns `RouteSlipError::Config` if the level is not a valid directive.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| RouteSlipError::Config(format!("invalid log level '{}': {e}", config.level)))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `RouteSlipError::Config` for an invalid level or if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    };

    installed.map_err(|e| RouteSlipError::Config(format!("logging already initialised: {e}")))
}
