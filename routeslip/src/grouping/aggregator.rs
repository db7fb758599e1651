//! Re-merging fanned-out pieces.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::errors::{Result, RouteSlipError};

/// Collects a known number of fan-out pieces, in any arrival order, and
/// flattens them by sequence number once all have arrived.
#[derive(Debug)]
pub struct ConcatAggregator {
    expected: usize,
    pieces: Mutex<BTreeMap<usize, Vec<String>>>,
}

impl ConcatAggregator {
    /// Creates an aggregator waiting for `expected` pieces.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            pieces: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of pieces the aggregator waits for.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.expected
    }

    /// Number of pieces received so far.
    #[must_use]
    pub fn received(&self) -> usize {
        self.pieces.lock().len()
    }

    /// Returns true once every expected piece has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.received() == self.expected
    }

    /// Offers the piece with sequence number `sequence`.
    ///
    /// Returns true if this piece completed the set.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::Aggregation` for a sequence number out of
    /// range or already received.
    pub fn offer(&self, sequence: usize, items: Vec<String>) -> Result<bool> {
        if sequence >= self.expected {
            return Err(RouteSlipError::Aggregation(format!(
                "sequence {sequence} out of range for {} pieces",
                self.expected
            )));
        }

        let mut pieces = self.pieces.lock();
        if pieces.contains_key(&sequence) {
            return Err(RouteSlipError::Aggregation(format!(
                "piece {sequence} received twice"
            )));
        }
        pieces.insert(sequence, items);
        Ok(pieces.len() == self.expected)
    }

    /// Flattens all pieces in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::Aggregation` if pieces are still missing.
    pub fn release(self) -> Result<Vec<String>> {
        let pieces = self.pieces.into_inner();
        if pieces.len() != self.expected {
            return Err(RouteSlipError::Aggregation(format!(
                "released with {} of {} pieces",
                pieces.len(),
                self.expected
            )));
        }
        Ok(pieces.into_values().flatten().collect())
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
    fn test_out_of_order_arrival() {
        let agg = ConcatAggregator::new(3);
        assert!(!agg.offer(2, v(&["c"])).unwrap());
        assert!(!agg.offer(0, v(&["a"])).unwrap());
        assert!(agg.offer(1, v(&["B", "B"])).unwrap());

        assert!(agg.is_complete());
        assert_eq!(agg.release().unwrap(), v(&["a", "B", "B", "c"]));
    }

    #[test]
    fn test_incomplete_release_fails() {
        let agg = ConcatAggregator::new(2);
        agg.offer(0, v(&["a"])).unwrap();
        assert_eq!(agg.received(), 1);
        assert!(matches!(agg.release(), Err(RouteSlipError::Aggregation(_))));
    }

    #[test]
    fn test_rejects_duplicates_and_out_of_range() {
        let agg = ConcatAggregator::new(1);
        assert!(agg.offer(1, v(&["x"])).is_err());
        agg.offer(0, v(&["x"])).unwrap();
        assert!(agg.offer(0, v(&["y"])).is_err());
    }

    #[test]
    fn test_zero_pieces() {
        let agg = ConcatAggregator::new(0);
        assert!(agg.is_complete());
        assert!(agg.release().unwrap().is_empty());
    }
}
