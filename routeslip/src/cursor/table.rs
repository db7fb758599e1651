//! Cursor state kept in a shared table keyed by request id.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use tracing::{debug, trace};

use super::{CursorPolicy, CursorStep, CursorStore};
use crate::config::CursorConfig;
use crate::context::{Itinerary, Liveness, RequestContext, RequestId};
use crate::errors::{Result, RouteSlipError};

/// Live cursor state for one request id.
#[derive(Debug)]
struct CursorEntry {
    itinerary: Itinerary,
    cursor: usize,
    liveness: Option<Weak<Liveness>>,
}

/// Everything the table knows about one id.
///
/// A slot moves from `Live` to `Retired` in place, under the shard lock of
/// its key, so no other call can observe the id between the two states.
#[derive(Debug)]
enum Slot {
    Live(CursorEntry),
    Retired(Option<Weak<Liveness>>),
}

impl Slot {
    fn liveness(&self) -> Option<&Weak<Liveness>> {
        match self {
            Self::Live(entry) => entry.liveness.as_ref(),
            Self::Retired(liveness) => liveness.as_ref(),
        }
    }

    const fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Slots without a liveness handle (created from a bare id) are never
    /// considered dead.
    fn is_dead(&self) -> bool {
        self.liveness().is_some_and(|weak| weak.strong_count() == 0)
    }
}

/// Shared cursor table keyed by request id.
///
/// The table is the single source of truth for a request's position, so
/// independently constructed copies of the same request (re-deliveries)
/// share progress. Each advance runs under the shard lock of its key only.
///
/// A live entry exists exactly while its request has been queried at least
/// once and has not exhausted its itinerary. Exhausted ids stay behind as
/// retired markers so that exhaustion is permanent. Markers and entries of
/// requests whose every copy has been dropped are swept periodically;
/// markers for bare ids are capped at `retired_capacity`, oldest first.
#[derive(Debug)]
pub struct TableCursorStore {
    slots: DashMap<RequestId, Slot>,
    keyed_retired: Mutex<VecDeque<RequestId>>,
    retired_capacity: usize,
    calls: AtomicU64,
    reap_interval: u64,
}

impl Default for TableCursorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableCursorStore {
    /// Creates a table with the default sweep interval.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&CursorConfig::default())
    }

    /// Creates a table from configuration.
    ///
    /// `shard_amount` must already be validated (see `CursorConfig::validate`).
    #[must_use]
    pub fn from_config(config: &CursorConfig) -> Self {
        let slots = match config.shard_amount {
            Some(shards) => DashMap::with_shard_amount(shards),
            None => DashMap::new(),
        };

        Self {
            slots,
            keyed_retired: Mutex::new(VecDeque::new()),
            retired_capacity: config.retired_capacity,
            calls: AtomicU64::new(0),
            reap_interval: config.reap_interval,
        }
    }

    /// Returns true if live cursor state exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &RequestId) -> bool {
        self.slots.get(id).is_some_and(|slot| slot.is_live())
    }

    /// Returns the stored position for `id`, if it has live state.
    #[must_use]
    pub fn position(&self, id: &RequestId) -> Option<usize> {
        self.slots.get(id).and_then(|slot| match slot.value() {
            Slot::Live(entry) => Some(entry.cursor),
            Slot::Retired(_) => None,
        })
    }

    /// Returns true if `id` has exhausted its itinerary.
    #[must_use]
    pub fn is_retired(&self, id: &RequestId) -> bool {
        self.slots.get(id).is_some_and(|slot| !slot.is_live())
    }

    /// Number of retired markers currently held.
    #[must_use]
    pub fn retired_len(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_live()).count()
    }

    /// Drops all state for `id`, live or retired.
    pub fn forget(&self, id: &RequestId) {
        self.slots.remove(id);
    }

    /// Removes entries and retired markers whose request is no longer
    /// reachable. Returns how many were removed.
    pub fn reap(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_dead());
        let removed = before.saturating_sub(self.slots.len());

        if removed > 0 {
            debug!(removed, "reaped unreachable cursor state");
        }
        removed
    }

    fn maybe_reap(&self) {
        if self.reap_interval == 0 {
            return;
        }
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % self.reap_interval == 0 {
            self.reap();
        }
    }

    /// Records a bare-id marker and drops the oldest ones past capacity.
    ///
    /// Runs after the shard guard is released; a queued id that was
    /// forgotten or revived in the meantime is skipped by `remove_if`.
    fn remember_keyed(&self, id: RequestId) {
        let evicted: Vec<RequestId> = {
            let mut queue = self.keyed_retired.lock();
            queue.push_back(id);
            let excess = queue.len().saturating_sub(self.retired_capacity);
            queue.drain(..excess).collect()
        };

        for id in evicted {
            if self.slots.remove_if(&id, |_, slot| !slot.is_live()).is_some() {
                trace!(request_id = %id, "bare-id retired marker evicted");
            }
        }
    }

    fn advance_entry(
        &self,
        id: &RequestId,
        itinerary: &Itinerary,
        liveness: Option<Weak<Liveness>>,
    ) -> Result<(CursorStep, Option<RequestId>)> {
        let mut slot = match self.slots.entry(id.clone()) {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => {
                if itinerary.is_empty() {
                    let keyed = liveness.is_none().then(|| id.clone());
                    vacant.insert(Slot::Retired(liveness));
                    return Ok((CursorStep::Exhausted, keyed));
                }
                vacant.insert(Slot::Live(CursorEntry {
                    itinerary: itinerary.clone(),
                    cursor: 0,
                    liveness: None,
                }))
            }
        };

        // Everything below holds the shard lock of `id` through `slot`.
        let entry = match slot.value_mut() {
            Slot::Retired(_) => return Ok((CursorStep::Exhausted, None)),
            Slot::Live(entry) => entry,
        };
        if entry.liveness.is_none() {
            entry.liveness = liveness;
        }

        let len = entry.itinerary.len();
        let index = entry.cursor;
        if index >= len {
            let retired = entry.liveness.take();
            let keyed = retired.is_none().then(|| id.clone());
            *slot.value_mut() = Slot::Retired(retired);
            if index > len {
                drop(slot);
                if let Some(id) = keyed {
                    self.remember_keyed(id);
                }
                return Err(RouteSlipError::corrupted_cursor(id.as_str(), index, len));
            }
            return Ok((CursorStep::Exhausted, keyed));
        }

        let name = entry.itinerary[index].clone();
        entry.cursor = index + 1;
        let mut keyed = None;
        if entry.cursor == len {
            let retired = entry.liveness.take();
            keyed = retired.is_none().then(|| id.clone());
            *slot.value_mut() = Slot::Retired(retired);
            trace!(request_id = %id, "itinerary exhausted, entry retired");
        }
        Ok((CursorStep::Stage { index, name }, keyed))
    }

    fn settle(&self, outcome: Result<(CursorStep, Option<RequestId>)>) -> Result<CursorStep> {
        let step = outcome.map(|(step, keyed)| {
            if let Some(id) = keyed {
                self.remember_keyed(id);
            }
            step
        });
        self.maybe_reap();
        step
    }

    #[cfg(test)]
    fn corrupt(&self, id: &RequestId, cursor: usize) {
        if let Some(mut slot) = self.slots.get_mut(id) {
            if let Slot::Live(entry) = slot.value_mut() {
                entry.cursor = cursor;
            }
        }
    }
}

impl CursorStore for TableCursorStore {
    fn policy(&self) -> CursorPolicy {
        CursorPolicy::Table
    }

    fn advance(&self, request: &RequestContext) -> Result<CursorStep> {
        self.settle(self.advance_entry(request.id(), request.itinerary(), Some(request.liveness())))
    }

    fn advance_keyed(&self, id: &RequestId, itinerary: &Itinerary) -> Result<CursorStep> {
        self.settle(self.advance_entry(id, itinerary, None))
    }

    fn tracked(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_live()).count()
    }

    fn clear(&self) {
        self.slots.clear();
        self.keyed_retired.lock().clear();
    }
}
