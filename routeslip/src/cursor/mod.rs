//! Routing-slip cursors.
//!
//! This module provides:
//! - The `CursorStore` trait with embedded and table-backed policies
//! - `ItineraryCursor`, which hands out the next stage of a request
//! - `FixedSlipRoute`, a self-contained route over a fixed itinerary
//!
//! Both stores advance a request's position with a single atomic step: two
//! racing calls for the same request never receive the same index, and
//! indices are handed out in order without gaps.

mod embedded;
mod fixed;
mod itinerary_cursor;
mod table;

pub use embedded::EmbeddedCursorStore;
pub use fixed::FixedSlipRoute;
pub use itinerary_cursor::ItineraryCursor;
pub use table::TableCursorStore;

pub use crate::config::CursorPolicy;

use crate::context::{Itinerary, RequestContext, RequestId, StageName};
use crate::errors::Result;

/// Outcome of one cursor advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorStep {
    /// The stage at `index` was claimed by this call.
    Stage {
        /// Position of the stage within the itinerary.
        index: usize,
        /// The stage name.
        name: StageName,
    },
    /// The itinerary has no further stages.
    Exhausted,
}

impl CursorStep {
    /// Returns the stage name, if any.
    #[must_use]
    pub fn into_stage(self) -> Option<StageName> {
        match self {
            Self::Stage { name, .. } => Some(name),
            Self::Exhausted => None,
        }
    }

    /// Returns true for `Exhausted`.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Storage for per-request cursor state.
///
/// Implementations must make each advance atomic with respect to other
/// calls for the same request id, and must never fault for indexing past
/// the end of an itinerary.
#[cfg_attr(test, mockall::automock)]
pub trait CursorStore: Send + Sync {
    /// The storage policy implemented by this store.
    fn policy(&self) -> CursorPolicy;

    /// Claims the next stage of `request`.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::CorruptedCursor` if stored state no longer
    /// fits its itinerary.
    fn advance(&self, request: &RequestContext) -> Result<CursorStep>;

    /// Claims the next stage for a bare request id.
    ///
    /// `itinerary` is only consulted when the store holds no state for `id`.
    fn advance_keyed(&self, id: &RequestId, itinerary: &Itinerary) -> Result<CursorStep>;

    /// Number of requests with live cursor state held by the store.
    fn tracked(&self) -> usize;

    /// Drops all state held by the store.
    fn clear(&self);
}

/// Claims the next index of a cursor cell without moving past `len`.
///
/// Returns `Ok(Some(index))` for a claimed stage, `Ok(None)` once the cell
/// sits at `len`, and `Err(position)` if the cell is already beyond `len`.
pub(crate) fn claim_next(
    cell: &std::sync::atomic::AtomicUsize,
    len: usize,
) -> std::result::Result<Option<usize>, usize> {
    use std::sync::atomic::Ordering;

    match cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |pos| {
        (pos < len).then_some(pos + 1)
    }) {
        Ok(index) => Ok(Some(index)),
        Err(pos) if pos == len => Ok(None),
        Err(pos) => Err(pos),
    }
}
