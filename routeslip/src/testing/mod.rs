//! Testing utilities for routing-slip code.
//!
//! This module provides:
//! - Mock stages that record or fail
//! - Fixtures building cursors, requests and dispatchers
//! - Assertions over cursor walks

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_exhausted, assert_walk, collect_walk};
pub use fixtures::{dispatcher_with, request, table_cursor};
pub use mocks::{FailingStage, RecordingStage, SlowStage};
