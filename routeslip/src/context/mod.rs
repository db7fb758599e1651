//! Request-side data model.
//!
//! This module provides:
//! - Opaque request identifiers
//! - Immutable itineraries and stage-name resolution
//! - The in-flight request context carrying an embedded cursor

mod identity;
mod itinerary;
mod request;

pub use identity::RequestId;
pub use itinerary::{
    parse_transform_query, resolve_stage_names, Itinerary, StageName, TransformRequest,
    DEFAULT_SLIP_PARAM, PAYLOAD_PARAM,
};
pub use request::{Liveness, RequestContext};
