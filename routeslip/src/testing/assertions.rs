//! Assertions over cursor walks.

use crate::context::RequestContext;
use crate::cursor::ItineraryCursor;

/// Calls the cursor until it reports exhaustion, returning every stage.
///
/// Stops after `limit` stages to keep a broken cursor from looping forever.
pub fn collect_walk(cursor: &ItineraryCursor, request: &RequestContext, limit: usize) -> Vec<String> {
    std::iter::from_fn(|| cursor.next(request)).take(limit).collect()
}

/// Asserts that the cursor yields exactly `expected`, then nothing.
pub fn assert_walk(cursor: &ItineraryCursor, request: &RequestContext, expected: &[&str]) {
    let walked = collect_walk(cursor, request, expected.len() + 1);
    assert_eq!(
        walked, expected,
        "request {} walked {:?}, expected {:?}",
        request.id(), walked, expected
    );
    assert_exhausted(cursor, request);
}

/// Asserts that the cursor has nothing further for `request`.
pub fn assert_exhausted(cursor: &ItineraryCursor, request: &RequestContext) {
    let next = cursor.next(request);
    assert!(
        next.is_none(),
        "expected request {} to be exhausted, got stage {:?}",
        request.id(),
        next
    );
}
