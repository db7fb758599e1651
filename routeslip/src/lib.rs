//! # Routeslip
//!
//! Routing-slip message routing with a pluggable itinerary cursor.
//!
//! A request carries an ordered list of stage names, its itinerary. Each
//! time the request is handed back, the cursor yields the next stage name
//! until the itinerary is exhausted. Two cursor policies are provided:
//!
//! - **Embedded**: the position travels with the request context
//! - **Table**: positions live in a concurrent table keyed by request id
//!
//! On top of the cursor sit a [`dispatch::Dispatcher`] that walks messages
//! through registered stages and a [`grouping::StringGrouper`] that fans
//! grouped items out along a shared slip and re-merges them.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routeslip::prelude::*;
//!
//! let dispatcher = Dispatcher::from_config(&RouteSlipConfig::default())?;
//! let message = Message::new(Itinerary::new(["uppercase", "capitalize"]), "hello");
//! let out = dispatcher.dispatch(message).await?;
//! assert_eq!(out, Payload::from("hello upper capitalize"));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod cursor;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod grouping;
pub mod observability;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{CursorConfig, CursorPolicy, RouteSlipConfig};
    pub use crate::context::{
        parse_transform_query, Itinerary, RequestContext, RequestId, StageName,
    };
    pub use crate::cursor::{
        CursorStep, CursorStore, EmbeddedCursorStore, FixedSlipRoute, ItineraryCursor,
        TableCursorStore,
    };
    pub use crate::dispatch::{Dispatcher, Message};
    pub use crate::errors::{Result, RouteSlipError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::grouping::{Grouping, StringGrouper};
    pub use crate::stages::{Payload, Stage, StageRegistry};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
