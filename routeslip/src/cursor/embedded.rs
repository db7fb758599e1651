//! Cursor state carried by the request itself.

use tracing::debug;

use super::{claim_next, CursorPolicy, CursorStep, CursorStore};
use crate::context::{Itinerary, RequestContext, RequestId};
use crate::errors::{Result, RouteSlipError};

/// Advances the cursor cell embedded in each `RequestContext`.
///
/// The store itself is stateless. Every copy of a context shares one atomic
/// cell, so concurrent calls on copies of the same request are safe. Two
/// independently constructed contexts with the same id have independent
/// cursors; use `TableCursorStore` when such copies must share progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCursorStore;

impl EmbeddedCursorStore {
    /// Creates the store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CursorStore for EmbeddedCursorStore {
    fn policy(&self) -> CursorPolicy {
        CursorPolicy::Embedded
    }

    fn advance(&self, request: &RequestContext) -> Result<CursorStep> {
        let itinerary = request.itinerary();
        match claim_next(request.cursor_cell(), itinerary.len()) {
            Ok(Some(index)) => {
                let name = itinerary[index].clone();
                debug!(request_id = %request.id(), index, stage = %name, "embedded cursor advanced");
                Ok(CursorStep::Stage { index, name })
            }
            Ok(None) => Ok(CursorStep::Exhausted),
            Err(pos) => Err(RouteSlipError::corrupted_cursor(
                request.id().as_str(),
                pos,
                itinerary.len(),
            )),
        }
    }

    /// A bare id carries no cursor cell, so there is nowhere to remember
    /// progress between calls.
    fn advance_keyed(&self, id: &RequestId, _itinerary: &Itinerary) -> Result<CursorStep> {
        Err(RouteSlipError::Config(format!(
            "embedded cursor policy needs the request context, got bare id '{id}'"
        )))
    }

    fn tracked(&self) -> usize {
        0
    }

    fn clear(&self) {}
}
