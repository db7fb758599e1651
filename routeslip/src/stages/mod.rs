//! Stage trait and implementations.
//!
//! Stages are the named destinations a routing slip points at. The cursor
//! never looks inside them; only the dispatcher resolves a stage name to a
//! `Stage` and runs it.

mod registry;
mod transforms;

pub use registry::StageRegistry;
pub use transforms::{
    names, CapitalizeStage, JoinStringsStage, LowercaseStage, StringsToUpperStage, UppercaseStage,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::Result;

/// The data a message carries from stage to stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// A single string, as produced by the transform endpoint.
    Text(String),
    /// A list of strings, as produced by the grouping flow.
    Items(Vec<String>),
}

impl Payload {
    /// Short name of the payload shape, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Items(_) => "list",
        }
    }

    /// Returns the text, if this is a text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Items(_) => None,
        }
    }

    /// Converts into a list; a text payload becomes a single item.
    #[must_use]
    pub fn into_items(self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text],
            Self::Items(items) => items,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<String>> for Payload {
    fn from(items: Vec<String>) -> Self {
        Self::Items(items)
    }
}

/// A named processing step the dispatcher can route to.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name itineraries use for this stage.
    fn name(&self) -> &str;

    /// Transforms the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot process the payload; the
    /// dispatcher stops walking the itinerary.
    async fn execute(&self, payload: Payload) -> Result<Payload>;
}

/// A stage backed by a synchronous closure.
pub struct FnStage<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, payload: Payload) -> Result<Payload> {
        (self.func)(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_stage() {
        let stage = FnStage::new("reverse", |payload: Payload| {
            Ok(Payload::Text(payload.as_text().unwrap_or_default().chars().rev().collect()))
        });

        assert_eq!(stage.name(), "reverse");
        let output = stage.execute("abc".into()).await.unwrap();
        assert_eq!(output, Payload::Text("cba".to_string()));
    }

    #[test]
    fn test_payload_conversions() {
        assert_eq!(Payload::from("x").kind(), "text");
        assert_eq!(Payload::from(vec!["a".to_string()]).kind(), "list");
        assert_eq!(Payload::from("x").into_items(), vec!["x".to_string()]);
        assert_eq!(Payload::Items(vec![]).as_text(), None);
    }

    #[test]
    fn test_payload_untagged_json() {
        let text: Payload = serde_json::from_str("\"hi\"").unwrap();
        let items: Payload = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(text, Payload::Text("hi".to_string()));
        assert_eq!(items, Payload::Items(vec!["a".to_string(), "b".to_string()]));
    }
}
