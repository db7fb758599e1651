//! The dispatcher and the messages it routes.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::{DispatcherConfig, RouteSlipConfig};
use crate::context::{Itinerary, RequestContext, StageName};
use crate::cursor::{FixedSlipRoute, ItineraryCursor};
use crate::errors::{Result, RouteSlipError};
use crate::events::{types, EventSink, NoOpEventSink};
use crate::stages::{Payload, StageRegistry};

/// A request together with the payload it carries.
#[derive(Debug, Clone)]
pub struct Message {
    /// The in-flight request and its routing slip.
    pub request: RequestContext,
    /// The current payload.
    pub payload: Payload,
}

impl Message {
    /// Creates a message for a new request with the given itinerary.
    #[must_use]
    pub fn new(itinerary: Itinerary, payload: impl Into<Payload>) -> Self {
        Self::for_request(RequestContext::new(itinerary), payload)
    }

    /// Creates a message for an existing request.
    #[must_use]
    pub fn for_request(request: RequestContext, payload: impl Into<Payload>) -> Self {
        Self {
            request,
            payload: payload.into(),
        }
    }
}

/// Routes messages through the stages named by their routing slips.
///
/// Stages of one message run strictly one after another; separate messages
/// may be walked concurrently with [`dispatch_all`](Self::dispatch_all).
pub struct Dispatcher {
    registry: Arc<StageRegistry>,
    cursor: ItineraryCursor,
    events: Arc<dyn EventSink>,
    config: DispatcherConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("cursor", &self.cursor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(registry: Arc<StageRegistry>, cursor: ItineraryCursor) -> Self {
        Self {
            registry,
            cursor,
            events: Arc::new(NoOpEventSink),
            config: DispatcherConfig::default(),
        }
    }

    /// Creates a dispatcher over the built-in stages with the configured
    /// cursor policy.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::Config` for an invalid configuration.
    pub fn from_config(config: &RouteSlipConfig) -> Result<Self> {
        config.validate()?;
        let cursor = ItineraryCursor::from_config(&config.cursor)?;
        Ok(Self::new(Arc::new(StageRegistry::with_builtin_stages()), cursor)
            .with_config(config.dispatcher.clone()))
    }

    /// Sets the dispatcher configuration.
    #[must_use]
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink for routing events.
    ///
    /// The cursor keeps its own sink; set it on the cursor before handing it
    /// to the dispatcher to observe cursor events as well.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the cursor.
    #[must_use]
    pub const fn cursor(&self) -> &ItineraryCursor {
        &self.cursor
    }

    /// Returns the stage registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    /// Walks a message through every remaining stage of its slip.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::UnknownStage` if the slip names a stage that
    /// is not registered, or the first error a stage returns.
    pub async fn dispatch(&self, message: Message) -> Result<Payload> {
        let Message { request, payload } = message;
        let request_id = request.id().to_string();
        self.walk(&request_id, || self.cursor.next(&request), payload)
            .await
    }

    /// Walks a payload through a self-contained route.
    pub async fn dispatch_route(&self, route: &FixedSlipRoute, payload: impl Into<Payload>) -> Result<Payload> {
        self.walk("fixed-route", || route.next_stage(), payload.into())
            .await
    }

    /// Walks many messages concurrently, bounded by `max_concurrency`.
    ///
    /// Results are returned in the order of `messages`.
    pub async fn dispatch_all(self: &Arc<Self>, messages: Vec<Message>) -> Vec<Result<Payload>> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let handles: Vec<_> = messages
            .into_iter()
            .map(|message| {
                let dispatcher = Arc::clone(self);
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| RouteSlipError::Join(e.to_string()))?;
                    dispatcher.dispatch(message).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|e| Err(RouteSlipError::Join(e.to_string()))))
            .collect()
    }

    async fn walk<F>(&self, request_id: &str, mut next_stage: F, mut payload: Payload) -> Result<Payload>
    where
        F: FnMut() -> Option<StageName> + Send,
    {
        let mut hops = 0usize;

        while let Some(stage_name) = next_stage() {
            let stage = match self.registry.get(&stage_name) {
                Ok(stage) => stage,
                Err(err) => {
                    warn!(request_id, stage = %stage_name, "no route to stage");
                    self.report_failure(request_id, &stage_name, &err);
                    return Err(err);
                }
            };

            debug!(request_id, stage = %stage_name, hop = hops, "routing to stage");
            self.events.try_emit(
                types::DISPATCH_ROUTED,
                Some(serde_json::json!({
                    "request_id": request_id,
                    "stage": stage_name,
                    "hop": hops,
                })),
            );

            payload = match stage.execute(payload).await {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(request_id, stage = %stage_name, error = %err, "stage failed");
                    self.report_failure(request_id, &stage_name, &err);
                    return Err(err);
                }
            };
            hops += 1;
        }

        info!(request_id, hops, "routing slip completed");
        self.events.try_emit(
            types::DISPATCH_COMPLETED,
            Some(serde_json::json!({ "request_id": request_id, "hops": hops })),
        );
        Ok(payload)
    }

    fn report_failure(&self, request_id: &str, stage: &str, err: &RouteSlipError) {
        self.events.try_emit(
            types::DISPATCH_FAILED,
            Some(serde_json::json!({
                "request_id": request_id,
                "stage": stage,
                "error": err.to_record(),
            })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::testing::{FailingStage, RecordingStage};
    use pretty_assertions::assert_eq;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(StageRegistry::with_builtin_stages()),
            ItineraryCursor::embedded(),
        )
    }

    #[tokio::test]
    async fn test_dispatch_walks_slip() {
        let message = Message::new(Itinerary::new(["uppercase", "capitalize"]), "hello");
        let out = dispatcher().dispatch(message).await.unwrap();
        assert_eq!(out, Payload::from("hello upper capitalize"));
    }

    #[tokio::test]
    async fn test_dispatch_empty_slip_returns_payload_untouched() {
        let out = dispatcher()
            .dispatch(Message::new(Itinerary::empty(), "same"))
            .await
            .unwrap();
        assert_eq!(out, Payload::from("same"));
    }

    #[tokio::test]
    async fn test_unknown_stage_fails_dispatch() {
        let sink = Arc::new(CollectingEventSink::new());
        let dispatcher = dispatcher().with_event_sink(sink.clone());
        let message = Message::new(Itinerary::new(["uppercase", "teleport", "lowercase"]), "x");

        let err = dispatcher.dispatch(message).await.unwrap_err();
        assert!(matches!(err, RouteSlipError::UnknownStage { ref stage } if stage == "teleport"));
        assert_eq!(sink.count(types::DISPATCH_ROUTED), 1);
        assert_eq!(sink.count(types::DISPATCH_FAILED), 1);
        assert_eq!(sink.count(types::DISPATCH_COMPLETED), 0);
    }

    #[tokio::test]
    async fn test_stage_error_stops_walk() {
        let sink = Arc::new(CollectingEventSink::new());
        let registry = StageRegistry::with_builtin_stages();
        let after = Arc::new(RecordingStage::new("after"));
        registry.register(Arc::new(FailingStage::new("boom")));
        registry.register(after.clone());
        let dispatcher = Dispatcher::new(Arc::new(registry), ItineraryCursor::embedded())
            .with_event_sink(sink.clone());

        let message = Message::new(Itinerary::new(["uppercase", "boom", "after"]), "x");
        let err = dispatcher.dispatch(message).await.unwrap_err();

        assert!(matches!(err, RouteSlipError::PayloadMismatch { ref stage, .. } if stage == "boom"));
        assert_eq!(after.call_count(), 0);
        assert_eq!(sink.count(types::DISPATCH_ROUTED), 2);
        assert_eq!(sink.count(types::DISPATCH_FAILED), 1);
        assert_eq!(sink.count(types::DISPATCH_COMPLETED), 0);

        let failed = sink.events_of_type(types::DISPATCH_FAILED);
        let data = failed[0].1.as_ref().unwrap();
        assert_eq!(data["stage"], "boom");
        assert_eq!(data["error"]["code"], "ROUTESLIP-PAYLOAD-MISMATCH");
    }

    #[tokio::test]
    async fn test_dispatch_route() {
        let route = FixedSlipRoute::new(Itinerary::new(["lowercase", "capitalize"]));
        let out = dispatcher().dispatch_route(&route, "Text").await.unwrap();
        assert_eq!(out, Payload::from("Text lower capitalize"));

        let again = dispatcher().dispatch_route(&route, "Text").await.unwrap();
        assert_eq!(again, Payload::from("Text"));
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = RouteSlipConfig::from_json_str(r#"{"cursor": {"policy": "table"}}"#).unwrap();
        let dispatcher = Dispatcher::from_config(&config).unwrap();
        assert_eq!(dispatcher.cursor().policy(), crate::config::CursorPolicy::Table);
        assert_eq!(dispatcher.registry().len(), 5);
    }
}
