//! The in-flight request a routing slip is attached to.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use super::identity::RequestId;
use super::itinerary::{Itinerary, StageName};
use crate::errors::{Result, RouteSlipError};

/// Token whose strong count tracks whether any copy of a request is alive.
#[derive(Debug, Default)]
pub struct Liveness;

/// One in-flight request: identity, itinerary and embedded cursor.
///
/// Clones share the cursor cell and the liveness token, so a copy handed to
/// another worker (a re-delivery of the same message) advances the same
/// routing slip.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: RequestId,
    itinerary: Itinerary,
    cursor: Arc<AtomicUsize>,
    liveness: Arc<Liveness>,
}

impl RequestContext {
    /// Creates a context with a generated id and a cursor at 0.
    #[must_use]
    pub fn new(itinerary: Itinerary) -> Self {
        Self::with_id(RequestId::generate(), itinerary)
    }

    /// Creates a context with a caller-supplied id and a cursor at 0.
    #[must_use]
    pub fn with_id(id: impl Into<RequestId>, itinerary: Itinerary) -> Self {
        Self {
            id: id.into(),
            itinerary,
            cursor: Arc::new(AtomicUsize::new(0)),
            liveness: Arc::new(Liveness),
        }
    }

    /// Rehydrates a context at a known cursor position.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::InvalidCursor` if `cursor` is past the end of
    /// the itinerary.
    pub fn resume(id: impl Into<RequestId>, itinerary: Itinerary, cursor: usize) -> Result<Self> {
        if cursor > itinerary.len() {
            return Err(RouteSlipError::InvalidCursor {
                cursor,
                len: itinerary.len(),
            });
        }

        let ctx = Self::with_id(id, itinerary);
        ctx.cursor.store(cursor, Ordering::Release);
        Ok(ctx)
    }

    /// Returns the request id.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        &self.id
    }

    /// Returns the itinerary.
    #[must_use]
    pub const fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    /// Returns how many stages have been handed out through the embedded cursor.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Returns true once the embedded cursor has reached the end.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.position() >= self.itinerary.len()
    }

    /// Returns the stages not yet handed out by the embedded cursor.
    #[must_use]
    pub fn remaining(&self) -> &[StageName] {
        let pos = self.position().min(self.itinerary.len());
        &self.itinerary[pos..]
    }

    /// Returns a weak handle that dies with the last copy of this request.
    #[must_use]
    pub fn liveness(&self) -> Weak<Liveness> {
        Arc::downgrade(&self.liveness)
    }

    /// Shared embedded cursor cell.
    pub(crate) fn cursor_cell(&self) -> &AtomicUsize {
        &self.cursor
    }
}
