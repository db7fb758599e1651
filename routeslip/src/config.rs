//! Configuration types for cursors, dispatchers and logging.
//!
//! Every field has a serde default, so a partial JSON document (or `{}`)
//! deserializes into a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::context::DEFAULT_SLIP_PARAM;
use crate::errors::{Result, RouteSlipError};

/// Where a request's cursor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorPolicy {
    /// Cursor carried by the request context itself.
    #[default]
    Embedded,
    /// Cursor kept in a shared table keyed by request id.
    Table,
}

/// Cursor store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorConfig {
    /// Storage policy.
    #[serde(default)]
    pub policy: CursorPolicy,
    /// Sweep dead table entries every this many calls; 0 disables sweeping.
    #[serde(default = "default_reap_interval")]
    pub reap_interval: u64,
    /// Number of table shards; must be a power of two greater than 1.
    #[serde(default)]
    pub shard_amount: Option<usize>,
    /// Most exhaustion markers kept for bare request ids; the oldest are
    /// dropped first once the limit is passed.
    #[serde(default = "default_retired_capacity")]
    pub retired_capacity: usize,
}

fn default_reap_interval() -> u64 {
    1024
}

fn default_retired_capacity() -> usize {
    4096
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            policy: CursorPolicy::default(),
            reap_interval: default_reap_interval(),
            shard_amount: None,
            retired_capacity: default_retired_capacity(),
        }
    }
}

impl CursorConfig {
    /// Creates a cursor configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: CursorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the sweep interval.
    #[must_use]
    pub const fn with_reap_interval(mut self, calls: u64) -> Self {
        self.reap_interval = calls;
        self
    }

    /// Sets the table shard count.
    #[must_use]
    pub const fn with_shard_amount(mut self, shards: usize) -> Self {
        self.shard_amount = Some(shards);
        self
    }

    /// Sets how many bare-id exhaustion markers the table keeps.
    #[must_use]
    pub const fn with_retired_capacity(mut self, markers: usize) -> Self {
        self.retired_capacity = markers;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::Config` for a shard count that is not a
    /// power of two greater than 1.
    pub fn validate(&self) -> Result<()> {
        if let Some(shards) = self.shard_amount {
            if shards < 2 || !shards.is_power_of_two() {
                return Err(RouteSlipError::Config(format!(
                    "shard_amount must be a power of two greater than 1, got {shards}"
                )));
            }
        }
        Ok(())
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum number of messages walked concurrently by `dispatch_all`.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    16
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl DispatcherConfig {
    /// Sets the concurrency bound.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSlipConfig {
    /// Cursor settings.
    #[serde(default)]
    pub cursor: CursorConfig,
    /// Dispatcher settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Query parameter carrying stage names.
    #[serde(default = "default_slip_param")]
    pub slip_param: String,
}

fn default_slip_param() -> String {
    DEFAULT_SLIP_PARAM.to_string()
}

impl Default for RouteSlipConfig {
    fn default() -> Self {
        Self {
            cursor: CursorConfig::default(),
            dispatcher: DispatcherConfig::default(),
            logging: LoggingConfig::default(),
            slip_param: default_slip_param(),
        }
    }
}

impl RouteSlipConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON and a config error
    /// for invalid values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validates all sections.
    pub fn validate(&self) -> Result<()> {
        self.cursor.validate()?;
        if self.dispatcher.max_concurrency == 0 {
            return Err(RouteSlipError::Config(
                "dispatcher.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.slip_param.is_empty() {
            return Err(RouteSlipError::Config("slip_param must not be empty".to_string()));
        }
        Ok(())
    }
}
