//! Error types for routing-slip dispatch.
//!
//! Exhaustion of an itinerary is not an error and never appears here; it is
//! the normal `None` answer of the cursor. Everything in this module is a
//! genuine fault of the caller, a stage, or the cursor's internal state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for routeslip operations.
#[derive(Debug, Error)]
pub enum RouteSlipError {
    /// The dispatcher was asked to route to a stage nobody registered.
    #[error("Unknown stage: '{stage}'")]
    UnknownStage {
        /// The stage name taken from the itinerary.
        stage: String,
    },

    /// Stored cursor state no longer fits its itinerary.
    #[error("Corrupted cursor for request '{request_id}': position {cursor} exceeds itinerary length {len}")]
    CorruptedCursor {
        /// The request whose state is corrupted.
        request_id: String,
        /// The stored cursor position.
        cursor: usize,
        /// The itinerary length.
        len: usize,
    },

    /// A request context was constructed with a cursor past its itinerary.
    #[error("Invalid cursor {cursor} for itinerary of length {len}")]
    InvalidCursor {
        /// The requested cursor position.
        cursor: usize,
        /// The itinerary length.
        len: usize,
    },

    /// A stage received a payload shape it cannot handle.
    #[error("Stage '{stage}' expected a {expected} payload")]
    PayloadMismatch {
        /// The stage name.
        stage: String,
        /// The payload kind the stage expected.
        expected: &'static str,
    },

    /// The aggregator could not assemble a complete result.
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dispatch task panicked or was aborted.
    #[error("Dispatch task failed: {0}")]
    Join(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouteSlipError {
    /// Creates an unknown stage error.
    #[must_use]
    pub fn unknown_stage(stage: impl Into<String>) -> Self {
        Self::UnknownStage {
            stage: stage.into(),
        }
    }

    /// Creates a corrupted cursor error.
    #[must_use]
    pub fn corrupted_cursor(request_id: impl Into<String>, cursor: usize, len: usize) -> Self {
        Self::CorruptedCursor {
            request_id: request_id.into(),
            cursor,
            len,
        }
    }

    /// Creates a payload mismatch error.
    #[must_use]
    pub fn payload_mismatch(stage: impl Into<String>, expected: &'static str) -> Self {
        Self::PayloadMismatch {
            stage: stage.into(),
            expected,
        }
    }

    /// Returns a stable code for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownStage { .. } => "ROUTESLIP-UNKNOWN-STAGE",
            Self::CorruptedCursor { .. } => "ROUTESLIP-CORRUPTED-CURSOR",
            Self::InvalidCursor { .. } => "ROUTESLIP-INVALID-CURSOR",
            Self::PayloadMismatch { .. } => "ROUTESLIP-PAYLOAD-MISMATCH",
            Self::Aggregation(_) => "ROUTESLIP-AGGREGATION",
            Self::Config(_) => "ROUTESLIP-CONFIG",
            Self::Join(_) => "ROUTESLIP-JOIN",
            Self::Serialization(_) => "ROUTESLIP-SERIALIZATION",
            Self::Io(_) => "ROUTESLIP-IO",
        }
    }

    /// Converts to a diagnostic record for event sinks.
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        let mut context = HashMap::new();
        match self {
            Self::UnknownStage { stage } | Self::PayloadMismatch { stage, .. } => {
                context.insert("stage".to_string(), stage.clone());
            }
            Self::CorruptedCursor {
                request_id,
                cursor,
                len,
            } => {
                context.insert("request_id".to_string(), request_id.clone());
                context.insert("cursor".to_string(), cursor.to_string());
                context.insert("len".to_string(), len.to_string());
            }
            Self::InvalidCursor { cursor, len } => {
                context.insert("cursor".to_string(), cursor.to_string());
                context.insert("len".to_string(), len.to_string());
            }
            _ => {}
        }

        ErrorRecord {
            code: self.code().to_string(),
            message: self.to_string(),
            context,
        }
    }
}

/// A serializable snapshot of an error, attached to diagnostic events.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Error code (e.g., "ROUTESLIP-CORRUPTED-CURSOR").
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

/// Convenience alias used across the crate.
pub type Result<T, E = RouteSlipError> = std::result::Result<T, E>;
