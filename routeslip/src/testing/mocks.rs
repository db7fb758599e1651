//! Mock stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::errors::{Result, RouteSlipError};
use crate::stages::{Payload, Stage};

/// Passes payloads through unchanged and records each one.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    seen: Mutex<Vec<Payload>>,
}

impl RecordingStage {
    /// Creates a recording stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of payloads seen.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Returns every payload seen, in arrival order.
    #[must_use]
    pub fn seen(&self) -> Vec<Payload> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, payload: Payload) -> Result<Payload> {
        self.seen.lock().push(payload.clone());
        Ok(payload)
    }
}

/// Fails every payload with a payload mismatch.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
}

impl FailingStage {
    /// Creates a failing stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, payload: Payload) -> Result<Payload> {
        Err(RouteSlipError::payload_mismatch(
            self.name.clone(),
            match payload {
                Payload::Text(_) => "list",
                Payload::Items(_) => "text",
            },
        ))
    }
}

/// Sleeps before passing the payload through, to interleave concurrent walks.
#[derive(Debug)]
pub struct SlowStage {
    name: String,
    delay: Duration,
}

impl SlowStage {
    /// Creates a slow stage.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Stage for SlowStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, payload: Payload) -> Result<Payload> {
        tokio::time::sleep(self.delay).await;
        Ok(payload)
    }
}
