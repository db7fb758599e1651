//! Built-in stages.
//!
//! The text stages tag their input with the name of the transform they
//! stand for; the list stages operate on grouped items.

use async_trait::async_trait;

use super::{Payload, Stage};
use crate::errors::{Result, RouteSlipError};

/// Names of the built-in stages.
pub mod names {
    /// Tags a text payload with `" upper"`.
    pub const UPPERCASE: &str = "uppercase";
    /// Tags a text payload with `" lower"`.
    pub const LOWERCASE: &str = "lowercase";
    /// Tags a text payload with `" capitalize"`.
    pub const CAPITALIZE: &str = "capitalize";
    /// Joins a list payload into one comma-separated item.
    pub const JOIN_STRINGS: &str = "joinStrings";
    /// Uppercases every item of a list payload.
    pub const STRINGS_TO_UPPER: &str = "stringsToUpper";
}

fn append_suffix(stage: &str, payload: Payload, suffix: &str) -> Result<Payload> {
    match payload {
        Payload::Text(text) => Ok(Payload::Text(format!("{text} {suffix}"))),
        Payload::Items(_) => Err(RouteSlipError::payload_mismatch(stage, "text")),
    }
}

macro_rules! suffix_stage {
    ($(#[$doc:meta])* $ty:ident, $name:expr, $suffix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        #[async_trait]
        impl Stage for $ty {
            fn name(&self) -> &str {
                $name
            }

            async fn execute(&self, payload: Payload) -> Result<Payload> {
                append_suffix($name, payload, $suffix)
            }
        }
    };
}

suffix_stage!(
    /// The `uppercase` text stage.
    UppercaseStage,
    names::UPPERCASE,
    "upper"
);
suffix_stage!(
    /// The `lowercase` text stage.
    LowercaseStage,
    names::LOWERCASE,
    "lower"
);
suffix_stage!(
    /// The `capitalize` text stage.
    CapitalizeStage,
    names::CAPITALIZE,
    "capitalize"
);

/// Joins all items into a single comma-separated item.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinStringsStage;

#[async_trait]
impl Stage for JoinStringsStage {
    fn name(&self) -> &str {
        names::JOIN_STRINGS
    }

    async fn execute(&self, payload: Payload) -> Result<Payload> {
        Ok(Payload::Items(vec![payload.into_items().join(",")]))
    }
}

/// Uppercases each item independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringsToUpperStage;

#[async_trait]
impl Stage for StringsToUpperStage {
    fn name(&self) -> &str {
        names::STRINGS_TO_UPPER
    }

    async fn execute(&self, payload: Payload) -> Result<Payload> {
        Ok(Payload::Items(
            payload
                .into_items()
                .iter()
                .map(|item| item.to_uppercase())
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: &[&str]) -> Payload {
        Payload::Items(values.iter().map(ToString::to_string).collect())
    }

    #[tokio::test]
    async fn test_text_stages_tag_payload() {
        let out = UppercaseStage.execute("hi".into()).await.unwrap();
        assert_eq!(out, Payload::from("hi upper"));

        let out = LowercaseStage.execute(out).await.unwrap();
        let out = CapitalizeStage.execute(out).await.unwrap();
        assert_eq!(out, Payload::from("hi upper lower capitalize"));
    }

    #[tokio::test]
    async fn test_text_stage_rejects_list() {
        let err = UppercaseStage.execute(items(&["a"])).await.unwrap_err();
        assert!(matches!(
            err,
            RouteSlipError::PayloadMismatch { ref stage, expected: "text" } if stage == "uppercase"
        ));
    }

    #[tokio::test]
    async fn test_join_strings() {
        let out = JoinStringsStage.execute(items(&["b", "b", "b"])).await.unwrap();
        assert_eq!(out, items(&["b,b,b"]));
    }

    #[tokio::test]
    async fn test_strings_to_upper_keeps_items_separate() {
        let out = StringsToUpperStage.execute(items(&["b", "b", "b"])).await.unwrap();
        assert_eq!(out, items(&["B", "B", "B"]));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(UppercaseStage.name(), "uppercase");
        assert_eq!(JoinStringsStage.name(), "joinStrings");
        assert_eq!(StringsToUpperStage.name(), "stringsToUpper");
    }
}
