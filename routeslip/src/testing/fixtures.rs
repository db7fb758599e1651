//! Fixtures for cursor and dispatcher tests.

use std::sync::Arc;

use crate::context::{Itinerary, RequestContext};
use crate::cursor::{ItineraryCursor, TableCursorStore};
use crate::dispatch::Dispatcher;
use crate::stages::{Stage, StageRegistry};

/// Builds a request with a fixed id over the given stage names.
#[must_use]
pub fn request(id: &str, stages: &[&str]) -> RequestContext {
    RequestContext::with_id(id, Itinerary::new(stages.iter().copied()))
}

/// Builds a table-backed cursor and returns its store for inspection.
#[must_use]
pub fn table_cursor() -> (Arc<TableCursorStore>, ItineraryCursor) {
    let store = Arc::new(TableCursorStore::new());
    let cursor = ItineraryCursor::new(store.clone());
    (store, cursor)
}

/// Builds a dispatcher over the built-in stages plus `extra`.
#[must_use]
pub fn dispatcher_with(cursor: ItineraryCursor, extra: Vec<Arc<dyn Stage>>) -> Arc<Dispatcher> {
    let registry = StageRegistry::with_builtin_stages();
    for stage in extra {
        registry.register(stage);
    }
    Arc::new(Dispatcher::new(Arc::new(registry), cursor))
}
