//! Itineraries and stage-name resolution.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;

/// Name of a downstream processing stage.
pub type StageName = String;

/// An ordered, immutable sequence of stage names.
///
/// Shared on clone. There are no mutating operations: an itinerary is fixed
/// the moment it is attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<StageName>", into = "Vec<StageName>")]
pub struct Itinerary(Arc<[StageName]>);

impl Itinerary {
    /// Creates an itinerary from stage names, preserving order and duplicates.
    pub fn new<I, S>(stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StageName>,
    {
        Self(stages.into_iter().map(Into::into).collect())
    }

    /// Creates the empty itinerary.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Normalises a possibly missing itinerary; `None` becomes empty.
    pub fn from_optional<I, S>(stages: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StageName>,
    {
        stages.map_or_else(Self::empty, Self::new)
    }

    /// Returns the stage at `index`, or `None` past the end.
    #[must_use]
    pub fn stage(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Returns the stages as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[StageName] {
        &self.0
    }
}

impl Default for Itinerary {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Itinerary {
    type Target = [StageName];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<StageName>> for Itinerary {
    fn from(stages: Vec<StageName>) -> Self {
        Self(Arc::from(stages))
    }
}

impl From<Itinerary> for Vec<StageName> {
    fn from(itinerary: Itinerary) -> Self {
        itinerary.0.to_vec()
    }
}

impl<S: Into<StageName>> FromIterator<S> for Itinerary {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Turns raw stage-name tokens from an untrusted caller into an itinerary.
///
/// Tokens are not checked against any known stage set: unknown names pass
/// through and only fail later, when the dispatcher cannot route them.
/// A missing token list yields the empty itinerary.
pub fn resolve_stage_names<I, S>(tokens: Option<I>) -> Itinerary
where
    I: IntoIterator<Item = S>,
    S: Into<StageName>,
{
    Itinerary::from_optional(tokens)
}

/// Query parameter carrying the text payload of a transform request.
pub const PAYLOAD_PARAM: &str = "payload";

/// Default query parameter carrying stage names.
pub const DEFAULT_SLIP_PARAM: &str = "routing-slip";

/// A parsed inbound transform request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformRequest {
    /// The text to transform.
    pub payload: String,
    /// The requested itinerary.
    pub itinerary: Itinerary,
}

/// Parses a form-urlencoded query such as
/// `payload=hi&routing-slip=uppercase&routing-slip=capitalize`.
///
/// Every occurrence of `slip_param` contributes one stage, in order. A query
/// without any slip parameter yields an empty itinerary.
#[must_use]
pub fn parse_transform_query(query: &str, slip_param: &str) -> TransformRequest {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut payload = String::new();
    let mut stages: Option<Vec<String>> = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key == slip_param {
            stages.get_or_insert_with(Vec::new).push(value.into_owned());
        } else if key == PAYLOAD_PARAM {
            payload = value.into_owned();
        }
    }

    TransformRequest {
        payload,
        itinerary: resolve_stage_names(stages),
    }
}
