//! A route object that owns both its itinerary and its position.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::claim_next;
use crate::context::{Itinerary, StageName};

/// A single-use route over a fixed itinerary.
///
/// Unlike `ItineraryCursor`, the route is not keyed by request: the instance
/// is the state. Share one instance across every leg of one request and
/// create a new one per request.
#[derive(Debug)]
pub struct FixedSlipRoute {
    itinerary: Itinerary,
    cursor: AtomicUsize,
}

impl FixedSlipRoute {
    /// Creates a route positioned at the first stage.
    #[must_use]
    pub const fn new(itinerary: Itinerary) -> Self {
        Self {
            itinerary,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the next stage, or `None` once every stage was handed out.
    pub fn next_stage(&self) -> Option<StageName> {
        match claim_next(&self.cursor, self.itinerary.len()) {
            Ok(Some(index)) => Some(self.itinerary[index].clone()),
            // The cell only ever moves through `claim_next`, so it cannot
            // overrun the itinerary.
            Ok(None) | Err(_) => None,
        }
    }

    /// Returns how many stages have been handed out.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Returns the route's itinerary.
    #[must_use]
    pub const fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_route_hands_out_each_stage_once() {
        let route = FixedSlipRoute::new(Itinerary::new(["lowercase", "capitalize"]));

        assert_eq!(route.next_stage().as_deref(), Some("lowercase"));
        assert_eq!(route.next_stage().as_deref(), Some("capitalize"));
        assert_eq!(route.next_stage(), None);
        assert_eq!(route.next_stage(), None);
        assert_eq!(route.position(), 2);
    }

    #[test]
    fn test_fixed_route_empty() {
        let route = FixedSlipRoute::new(Itinerary::empty());
        assert_eq!(route.next_stage(), None);
        assert!(route.itinerary().is_empty());
    }
}
