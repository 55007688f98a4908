//! Memoized coverage results keyed by region name and mode.
//!
//! An entry is reusable only while the ledger it was computed from has the
//! same epoch and the same length. Ledgers are append-only between clears,
//! so a length match means the contents match too.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use fog_map_ledger::LedgerSnapshot;
use fog_map_ledger_models::VisitMode;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    epoch: u64,
    ledger_len: usize,
    percent: f64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<(String, VisitMode), CacheEntry>,
    /// Lowest epoch still accepted per mode; raised by every clear.
    floor: BTreeMap<VisitMode, u64>,
}

/// Thread-safe coverage cache.
///
/// The lock only guards map access; coverage is always computed outside
/// it, so two callers may race to fill the same key. The later write wins
/// and both values are correct for their snapshot.
#[derive(Debug, Default)]
pub struct CoverageCache {
    state: Mutex<CacheState>,
}

impl CoverageCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached percentage for `region` if it was computed against a ledger
    /// identical to `snapshot`.
    #[must_use]
    pub fn lookup(&self, region: &str, snapshot: &LedgerSnapshot) -> Option<f64> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = state.entries.get(&(region.to_string(), snapshot.mode()))?;

        debug_assert!(
            entry.epoch <= snapshot.epoch(),
            "cache entry for {region} is from a future epoch"
        );
        debug_assert!(
            entry.epoch != snapshot.epoch() || entry.ledger_len <= snapshot.len(),
            "{} ledger shrank from {} to {} without a clear",
            snapshot.mode(),
            entry.ledger_len,
            snapshot.len()
        );

        (entry.epoch == snapshot.epoch() && entry.ledger_len == snapshot.len())
            .then_some(entry.percent)
    }

    /// Records `percent` as the result for `region` at `snapshot`.
    ///
    /// Results computed against an epoch older than the last
    /// [`invalidate_mode`](Self::invalidate_mode) are discarded. Returns
    /// whether the value was stored.
    pub fn store(&self, region: &str, snapshot: &LedgerSnapshot, percent: f64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let floor = state.floor.get(&snapshot.mode()).copied().unwrap_or(0);
        if snapshot.epoch() < floor {
            log::debug!(
                "Discarding stale {} coverage for {region} (epoch {} < {floor})",
                snapshot.mode(),
                snapshot.epoch()
            );
            return false;
        }

        state.entries.insert(
            (region.to_string(), snapshot.mode()),
            CacheEntry {
                epoch: snapshot.epoch(),
                ledger_len: snapshot.len(),
                percent,
            },
        );
        true
    }

    /// Drops every entry for `mode` and refuses future writes computed
    /// before `epoch`.
    pub fn invalidate_mode(&self, mode: VisitMode, epoch: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.retain(|(_, entry_mode), _| *entry_mode != mode);

        let floor = state.floor.entry(mode).or_insert(0);
        *floor = (*floor).max(epoch);

        debug_assert!(
            state.entries.keys().all(|(_, entry_mode)| *entry_mode != mode),
            "cache entries for {mode} survived a clear"
        );
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fog_map_geography_models::Coordinate;
    use fog_map_ledger::VisitLedgers;
    use fog_map_ledger_models::LocationEvent;

    fn admit(ledgers: &VisitLedgers, lat: f64) {
        ledgers.admit(
            VisitMode::Test,
            &LocationEvent::new(Coordinate::new(lat, 0.0)),
        );
    }

    #[test]
    fn entry_is_valid_until_ledger_grows() {
        let ledgers = VisitLedgers::default();
        let cache = CoverageCache::new();
        admit(&ledgers, 0.0);

        let snapshot = ledgers.snapshot(VisitMode::Test);
        assert!(cache.store("A", &snapshot, 12.5));
        assert_eq!(cache.lookup("A", &ledgers.snapshot(VisitMode::Test)), Some(12.5));
        assert_eq!(cache.lookup("B", &ledgers.snapshot(VisitMode::Test)), None);

        admit(&ledgers, 0.01);
        assert_eq!(cache.lookup("A", &ledgers.snapshot(VisitMode::Test)), None);
    }

    #[test]
    fn entry_is_per_mode() {
        let ledgers = VisitLedgers::default();
        let cache = CoverageCache::new();

        cache.store("A", &ledgers.snapshot(VisitMode::Test), 1.0);
        assert_eq!(cache.lookup("A", &ledgers.snapshot(VisitMode::Explore)), None);
    }

    #[test]
    fn clear_invalidates_even_when_length_matches_again() {
        let ledgers = VisitLedgers::default();
        let cache = CoverageCache::new();
        admit(&ledgers, 0.0);
        cache.store("A", &ledgers.snapshot(VisitMode::Test), 50.0);

        let epoch = ledgers.clear(VisitMode::Test);
        cache.invalidate_mode(VisitMode::Test, epoch);
        admit(&ledgers, 0.5);

        assert_eq!(ledgers.len(VisitMode::Test), 1);
        assert_eq!(cache.lookup("A", &ledgers.snapshot(VisitMode::Test)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn in_flight_result_from_before_clear_is_discarded() {
        let ledgers = VisitLedgers::default();
        let cache = CoverageCache::new();
        admit(&ledgers, 0.0);

        let before_clear = ledgers.snapshot(VisitMode::Test);
        let epoch = ledgers.clear(VisitMode::Test);
        cache.invalidate_mode(VisitMode::Test, epoch);

        assert!(!cache.store("A", &before_clear, 75.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidation_leaves_other_mode_alone() {
        let ledgers = VisitLedgers::default();
        let cache = CoverageCache::new();
        cache.store("A", &ledgers.snapshot(VisitMode::Explore), 3.0);
        cache.store("A", &ledgers.snapshot(VisitMode::Test), 4.0);

        cache.invalidate_mode(VisitMode::Test, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("A", &ledgers.snapshot(VisitMode::Explore)), Some(3.0));
    }
}
