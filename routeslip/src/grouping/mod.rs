//! Grouping equal items, routing groups, and merging the results.
//!
//! The number of routed pieces equals the number of distinct values, so the
//! fan-out is only known after grouping; the aggregator is sized from it.

mod aggregator;
mod grouper;

pub use aggregator::ConcatAggregator;
pub use grouper::{group_same, Grouping, StringGrouper};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Itinerary;
    use crate::cursor::{CursorStore, ItineraryCursor, TableCursorStore};
    use crate::dispatch::Dispatcher;
    use crate::errors::RouteSlipError;
    use crate::stages::{names, StageRegistry};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn grouper(cursor: ItineraryCursor) -> StringGrouper {
        let registry = Arc::new(StageRegistry::with_builtin_stages());
        StringGrouper::new(Arc::new(Dispatcher::new(registry, cursor)))
    }

    fn abbbc() -> Vec<String> {
        ["a", "b", "b", "b", "c"].iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_groups_equal_items() {
        let result = grouper(ItineraryCursor::embedded())
            .group_same(Grouping::new(abbbc(), Itinerary::new([names::JOIN_STRINGS])))
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result, ["a", "b,b,b", "c"]);
    }

    #[tokio::test]
    async fn test_keeps_single_messages_if_not_joined() {
        let result = grouper(ItineraryCursor::embedded())
            .group_same(Grouping::new(abbbc(), Itinerary::new([names::STRINGS_TO_UPPER])))
            .await
            .unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(result, ["a", "B", "B", "B", "c"]);
    }

    #[tokio::test]
    async fn test_multi_stage_group_slip_with_table_cursor() {
        let store = Arc::new(TableCursorStore::new());
        let result = grouper(ItineraryCursor::new(store.clone()))
            .group_same(Grouping::new(
                ["x", "y", "x", "y", "z"].iter().map(ToString::to_string).collect(),
                Itinerary::new([names::STRINGS_TO_UPPER, names::JOIN_STRINGS]),
            ))
            .await
            .unwrap();

        assert_eq!(result, ["X,X", "Y,Y", "z"]);
        assert_eq!(store.tracked(), 0);
    }

    #[tokio::test]
    async fn test_unknown_group_stage_propagates() {
        let err = grouper(ItineraryCursor::embedded())
            .group_same(Grouping::new(abbbc(), Itinerary::new(["explode"])))
            .await
            .unwrap_err();
        assert!(matches!(err, RouteSlipError::UnknownStage { .. }));
    }

    #[tokio::test]
    async fn test_all_singletons_never_touch_dispatcher() {
        let result = grouper(ItineraryCursor::embedded())
            .group_same(Grouping::new(
                vec!["p".to_string(), "q".to_string()],
                Itinerary::new(["explode"]),
            ))
            .await
            .unwrap();
        assert_eq!(result, ["p", "q"]);
    }
}
