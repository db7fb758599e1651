//! The routing-slip cursor handed to dispatchers.

use std::fmt;
use std::sync::Arc;
use tracing::{error, trace};

use super::{CursorPolicy, CursorStep, CursorStore, EmbeddedCursorStore, TableCursorStore};
use crate::config::CursorConfig;
use crate::context::{Itinerary, RequestContext, RequestId, StageName};
use crate::errors::Result;
use crate::events::{types, EventSink, NoOpEventSink};
use crate::utils::iso_timestamp;

/// Hands out the next stage of a request's itinerary, exactly once per step.
///
/// The storage policy is fixed at construction by the injected
/// `CursorStore`. Cloning the cursor shares the store.
///
/// # Example
///
/// ```
/// use routeslip::context::{Itinerary, RequestContext};
/// use routeslip::cursor::ItineraryCursor;
///
/// let cursor = ItineraryCursor::table();
/// let request = RequestContext::new(Itinerary::new(["uppercase", "capitalize"]));
///
/// assert_eq!(cursor.next(&request).as_deref(), Some("uppercase"));
/// assert_eq!(cursor.next(&request).as_deref(), Some("capitalize"));
/// assert_eq!(cursor.next(&request), None);
/// ```
#[derive(Clone)]
pub struct ItineraryCursor {
    store: Arc<dyn CursorStore>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for ItineraryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItineraryCursor")
            .field("policy", &self.store.policy())
            .field("tracked", &self.store.tracked())
            .finish_non_exhaustive()
    }
}

impl ItineraryCursor {
    /// Creates a cursor over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CursorStore>) -> Self {
        Self {
            store,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Creates a cursor whose state travels with each request.
    #[must_use]
    pub fn embedded() -> Self {
        Self::new(Arc::new(EmbeddedCursorStore::new()))
    }

    /// Creates a cursor backed by a fresh request-id table.
    #[must_use]
    pub fn table() -> Self {
        Self::new(Arc::new(TableCursorStore::new()))
    }

    /// Creates a cursor with the configured policy.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::Config` for an invalid configuration.
    pub fn from_config(config: &CursorConfig) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn CursorStore> = match config.policy {
            CursorPolicy::Embedded => Arc::new(EmbeddedCursorStore::new()),
            CursorPolicy::Table => Arc::new(TableCursorStore::from_config(config)),
        };
        Ok(Self::new(store))
    }

    /// Sets the event sink for diagnostics.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the storage policy.
    #[must_use]
    pub fn policy(&self) -> CursorPolicy {
        self.store.policy()
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CursorStore> {
        &self.store
    }

    /// Returns the next stage for `request`, or `None` once exhausted.
    ///
    /// Internal faults are logged, reported as `cursor.fault` and answered
    /// with `None`.
    pub fn next(&self, request: &RequestContext) -> Option<StageName> {
        self.settle(request.id(), self.try_next(request))
    }

    /// Fallible form of [`next`](Self::next).
    pub fn try_next(&self, request: &RequestContext) -> Result<CursorStep> {
        self.store.advance(request)
    }

    /// Returns the next stage for a bare request id.
    ///
    /// `itinerary` is only used on the first call for `id`; a missing
    /// itinerary counts as empty. Requires a store that can hold state for a
    /// bare id (the table policy); other stores report a fault and yield
    /// `None`.
    pub fn next_for(&self, id: &RequestId, itinerary: Option<&Itinerary>) -> Option<StageName> {
        self.settle(id, self.try_next_for(id, itinerary))
    }

    /// Fallible form of [`next_for`](Self::next_for).
    pub fn try_next_for(&self, id: &RequestId, itinerary: Option<&Itinerary>) -> Result<CursorStep> {
        match itinerary {
            Some(itinerary) => self.store.advance_keyed(id, itinerary),
            None => self.store.advance_keyed(id, &Itinerary::empty()),
        }
    }

    fn settle(&self, id: &RequestId, step: Result<CursorStep>) -> Option<StageName> {
        match step {
            Ok(CursorStep::Stage { index, name }) => {
                trace!(request_id = %id, index, stage = %name, "next stage");
                self.events.try_emit(
                    types::CURSOR_ADVANCED,
                    Some(serde_json::json!({
                        "request_id": id.as_str(),
                        "index": index,
                        "stage": name,
                    })),
                );
                Some(name)
            }
            Ok(CursorStep::Exhausted) => {
                trace!(request_id = %id, "itinerary exhausted");
                self.events.try_emit(
                    types::CURSOR_EXHAUSTED,
                    Some(serde_json::json!({ "request_id": id.as_str() })),
                );
                None
            }
            Err(err) => {
                error!(request_id = %id, error = %err, "cursor fault, treating itinerary as exhausted");
                self.events.try_emit(
                    types::CURSOR_FAULT,
                    Some(serde_json::json!({
                        "request_id": id.as_str(),
                        "error": err.to_record(),
                        "at": iso_timestamp(),
                    })),
                );
                None
            }
        }
    }
}

impl Default for ItineraryCursor {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::MockCursorStore;
    use crate::errors::RouteSlipError;
    use crate::events::CollectingEventSink;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn both_policies() -> [ItineraryCursor; 2] {
        [ItineraryCursor::embedded(), ItineraryCursor::table()]
    }

    fn walk(cursor: &ItineraryCursor, request: &RequestContext) -> Vec<String> {
        std::iter::from_fn(|| cursor.next(request)).collect()
    }

    #[test]
    fn test_n_calls_yield_itinerary_then_done() {
        for cursor in both_policies() {
            let request = RequestContext::new(Itinerary::new(["upper", "lower", "capitalize"]));
            assert_eq!(walk(&cursor, &request), ["upper", "lower", "capitalize"]);
            assert_eq!(cursor.next(&request), None, "{:?}", cursor.policy());
        }
    }

    #[test]
    fn test_empty_itinerary_done_immediately() {
        for cursor in both_policies() {
            let request = RequestContext::new(Itinerary::empty());
            assert_eq!(cursor.next(&request), None);
        }
    }

    #[test]
    fn test_exhaustion_is_idempotent() {
        for cursor in both_policies() {
            let request = RequestContext::new(Itinerary::new(["a"]));
            assert_eq!(cursor.next(&request).as_deref(), Some("a"));
            for _ in 0..5 {
                assert_eq!(cursor.next(&request), None);
            }
        }
    }

    #[test]
    fn test_table_policy_evicts_on_exhaustion() {
        let store = Arc::new(TableCursorStore::new());
        let cursor = ItineraryCursor::new(store.clone());
        let request = RequestContext::new(Itinerary::new(["a", "b"]));

        cursor.next(&request);
        assert!(store.contains(request.id()));
        cursor.next(&request);
        assert!(!store.contains(request.id()));
        assert_eq!(cursor.store().tracked(), 0);
    }

    #[test]
    fn test_next_for_with_missing_itinerary() {
        let cursor = ItineraryCursor::table();
        assert_eq!(cursor.next_for(&RequestId::new("null"), None), None);
    }

    #[test]
    fn test_next_for_keyed_walk() {
        let cursor = ItineraryCursor::table();
        let id = RequestId::new("keyed");
        let itinerary = Itinerary::new(["x", "y"]);

        assert_eq!(cursor.next_for(&id, Some(&itinerary)).as_deref(), Some("x"));
        assert_eq!(cursor.next_for(&id, None).as_deref(), Some("y"));
        assert_eq!(cursor.next_for(&id, Some(&itinerary)), None);
    }

    #[test]
    fn test_next_for_on_embedded_policy_reports_fault() {
        let sink = Arc::new(CollectingEventSink::new());
        let cursor = ItineraryCursor::embedded().with_event_sink(sink.clone());

        let next = cursor.next_for(&RequestId::new("bare"), Some(&Itinerary::new(["a"])));
        assert_eq!(next, None);
        assert_eq!(sink.count(types::CURSOR_FAULT), 1);
    }

    #[test]
    fn test_events_for_walk() {
        let sink = Arc::new(CollectingEventSink::new());
        let cursor = ItineraryCursor::table().with_event_sink(sink.clone());
        let request = RequestContext::with_id("evented", Itinerary::new(["a", "b"]));

        walk(&cursor, &request);

        assert_eq!(sink.count(types::CURSOR_ADVANCED), 2);
        assert_eq!(sink.count(types::CURSOR_EXHAUSTED), 1);
        let advanced = sink.events_of_type(types::CURSOR_ADVANCED);
        let data = advanced[1].1.as_ref().unwrap();
        assert_eq!(data["request_id"], "evented");
        assert_eq!(data["index"], 1);
        assert_eq!(data["stage"], "b");
    }

    #[test]
    fn test_store_fault_becomes_done_with_diagnostic() {
        let mut store = MockCursorStore::new();
        store.expect_advance().times(1).returning(|request| {
            Err(RouteSlipError::corrupted_cursor(request.id().as_str(), 4, 2))
        });

        let sink = Arc::new(CollectingEventSink::new());
        let cursor = ItineraryCursor::new(Arc::new(store)).with_event_sink(sink.clone());
        let request = RequestContext::with_id("broken", Itinerary::new(["a", "b"]));

        assert_eq!(cursor.next(&request), None);

        let faults = sink.events_of_type(types::CURSOR_FAULT);
        assert_eq!(faults.len(), 1);
        let data = faults[0].1.as_ref().unwrap();
        assert_eq!(data["request_id"], "broken");
        assert_eq!(data["error"]["code"], "ROUTESLIP-CORRUPTED-CURSOR");
        assert!(data["at"].is_string());
    }

    #[test]
    fn test_try_next_surfaces_fault() {
        let mut store = MockCursorStore::new();
        store
            .expect_advance()
            .returning(|_| Err(RouteSlipError::corrupted_cursor("r", 9, 1)));

        let cursor = ItineraryCursor::new(Arc::new(store));
        let request = RequestContext::new(Itinerary::new(["a"]));
        assert!(matches!(
            cursor.try_next(&request),
            Err(RouteSlipError::CorruptedCursor { cursor: 9, .. })
        ));
    }

    #[test]
    fn test_from_config_selects_policy() {
        let table = ItineraryCursor::from_config(
            &CursorConfig::new().with_policy(CursorPolicy::Table),
        )
        .unwrap();
        assert_eq!(table.policy(), CursorPolicy::Table);

        let embedded = ItineraryCursor::from_config(&CursorConfig::new()).unwrap();
        assert_eq!(embedded.policy(), CursorPolicy::Embedded);

        assert!(ItineraryCursor::from_config(&CursorConfig::new().with_shard_amount(6)).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_same_request_each_index_once() {
        for cursor in both_policies() {
            let k = 32;
            let request = RequestContext::new(Itinerary::new((0..k + 8).map(|i| format!("s{i}"))));

            let tasks: Vec<_> = (0..k)
                .map(|_| {
                    let cursor = cursor.clone();
                    let request = request.clone();
                    tokio::spawn(async move { cursor.next(&request) })
                })
                .collect();

            let mut seen = HashSet::new();
            for task in tasks {
                let stage = task.await.unwrap().unwrap();
                assert!(seen.insert(stage), "duplicate stage handed out");
            }
            let expected: HashSet<_> = (0..k).map(|i| format!("s{i}")).collect();
            assert_eq!(seen, expected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_do_not_share_cursors() {
        for cursor in both_policies() {
            let itinerary = Itinerary::new(["a", "b", "c"]);
            let tasks: Vec<_> = (0..20)
                .map(|_| {
                    let cursor = cursor.clone();
                    let request = RequestContext::new(itinerary.clone());
                    tokio::spawn(async move {
                        let mut stages = Vec::new();
                        while let Some(stage) = cursor.next(&request) {
                            stages.push(stage);
                            tokio::task::yield_now().await;
                        }
                        stages
                    })
                })
                .collect();

            for task in tasks {
                assert_eq!(task.await.unwrap(), ["a", "b", "c"]);
            }
        }
    }
}
