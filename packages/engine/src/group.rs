//! Per-group coverage listings and their refresh throttle.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use fog_map_ledger_models::VisitMode;
use serde::Serialize;

/// Coverage of one region within a group listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionCoverage {
    /// Region name.
    pub name: String,
    /// Group tag, if the region has one.
    pub borough: Option<String>,
    /// Explored share in percent.
    pub percent: f64,
}

/// Sorts by descending percentage. Ties keep their catalog order.
pub fn sort_by_coverage(results: &mut [RegionCoverage]) {
    results.sort_by(|a, b| b.percent.total_cmp(&a.percent));
}

#[derive(Debug)]
struct Refresh {
    at: Instant,
    version: (u64, usize),
    results: Vec<RegionCoverage>,
}

/// Remembers the last listing per `(group, mode)` and decides whether a
/// new one is due.
///
/// An unforced refresh is due only when the ledger changed since the last
/// listing and at least the configured interval has passed.
#[derive(Debug)]
pub struct RefreshThrottle {
    interval: Duration,
    entries: Mutex<BTreeMap<(String, VisitMode), Refresh>>,
}

impl RefreshThrottle {
    /// Creates a throttle with the given minimum interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// The previous listing if a refresh is not due yet.
    #[must_use]
    pub fn reuse(
        &self,
        group: &str,
        mode: VisitMode,
        version: (u64, usize),
        force: bool,
    ) -> Option<Vec<RegionCoverage>> {
        if force {
            return None;
        }

        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.get(&(group.to_string(), mode))?;

        let unchanged = previous.version == version;
        let too_soon = previous.at.elapsed() < self.interval;
        (unchanged || too_soon).then(|| previous.results.clone())
    }

    /// Stores `results` as the listing for `(group, mode)` at `version`.
    pub fn record(
        &self,
        group: &str,
        mode: VisitMode,
        version: (u64, usize),
        results: Vec<RegionCoverage>,
    ) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (group.to_string(), mode),
                Refresh {
                    at: Instant::now(),
                    version,
                    results,
                },
            );
    }

    /// Drops every listing for `mode`.
    pub fn forget_mode(&self, mode: VisitMode) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(_, entry_mode), _| *entry_mode != mode);
    }
}
