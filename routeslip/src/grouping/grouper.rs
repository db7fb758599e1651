//! Grouping equal items and routing each group along the same slip.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

use super::ConcatAggregator;
use crate::context::{Itinerary, RequestContext};
use crate::dispatch::{Dispatcher, Message};
use crate::errors::{Result, RouteSlipError};
use crate::stages::Payload;

/// Items to group, with the slip every group follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    /// Items to group by equality.
    pub items: Vec<String>,
    /// The routing slip attached to every group.
    pub itinerary: Itinerary,
}

impl Grouping {
    /// Creates a grouping request.
    #[must_use]
    pub fn new(items: Vec<String>, itinerary: Itinerary) -> Self {
        Self { items, itinerary }
    }
}

/// Partitions items into groups of exactly-equal values, ordered by the
/// first appearance of each value.
#[must_use]
pub fn group_same(items: &[String]) -> Vec<Vec<String>> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<String>> = Vec::new();

    for item in items {
        let slot = *slots.entry(item.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(item.clone());
    }

    groups
}

/// Fans grouped items out along a slip and merges the results.
///
/// A group holding a single item skips the slip and is passed to the
/// aggregator as is. Every larger group becomes its own request with the
/// shared itinerary and is walked by the dispatcher.
#[derive(Debug, Clone)]
pub struct StringGrouper {
    dispatcher: Arc<Dispatcher>,
}

impl StringGrouper {
    /// Creates a grouper routing groups through `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Groups, routes and re-merges the items of `grouping`.
    ///
    /// # Errors
    ///
    /// Returns the first routing error of any group, or an aggregation error.
    pub async fn group_same(&self, grouping: Grouping) -> Result<Vec<String>> {
        let groups = group_same(&grouping.items);
        let aggregator = ConcatAggregator::new(groups.len());
        let mut routed = JoinSet::new();

        for (sequence, group) in groups.into_iter().enumerate() {
            if group.len() == 1 {
                debug!(sequence, "single item bypasses routing slip");
                aggregator.offer(sequence, group)?;
                continue;
            }

            let request = RequestContext::new(grouping.itinerary.clone());
            debug!(sequence, request_id = %request.id(), size = group.len(), "routing group");
            let dispatcher = Arc::clone(&self.dispatcher);
            routed.spawn(async move {
                let payload = dispatcher
                    .dispatch(Message::for_request(request, Payload::Items(group)))
                    .await;
                (sequence, payload)
            });
        }

        while let Some(joined) = routed.join_next().await {
            let (sequence, payload) = joined.map_err(|e| RouteSlipError::Join(e.to_string()))?;
            aggregator.offer(sequence, payload?.into_items())?;
        }

        aggregator.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_group_same_multiplicities() {
        let groups = group_same(&v(&["a", "b", "b", "b", "c"]));
        assert_eq!(groups, vec![v(&["a"]), v(&["b", "b", "b"]), v(&["c"])]);
    }

    #[test]
    fn test_group_same_non_adjacent_values() {
        let groups = group_same(&v(&["x", "y", "x"]));
        assert_eq!(groups, vec![v(&["x", "x"]), v(&["y"])]);
    }

    #[test]
    fn test_group_same_empty() {
        assert!(group_same(&[]).is_empty());
    }
}
