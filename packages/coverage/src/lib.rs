#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exploration coverage estimator.
//!
//! Turns a region boundary plus a ledger snapshot into the percentage of
//! the region within the visibility radius of some visited point. The
//! estimate walks a fixed-resolution sampling grid (see [`grid`]) and is
//! memoized per `(region, mode)` until the ledger changes (see [`cache`]).

pub mod cache;
pub mod grid;

use fog_map_ledger::LedgerSnapshot;
use fog_map_neighborhood_models::Region;
use serde::{Deserialize, Serialize};

pub use cache::CoverageCache;
pub use grid::{CoverageEstimate, estimate};

/// Tunables for the coverage grid walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CoverageConfig {
    /// Radius around each visited point counted as revealed, in meters.
    pub visibility_radius_meters: f64,
    /// Spacing of the sampling grid in degrees.
    pub sample_step_degrees: f64,
    /// Upper bound on bounding-box samples; the step is widened to fit.
    pub max_grid_samples: u64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            visibility_radius_meters: 60.0,
            sample_step_degrees: 0.000_75,
            max_grid_samples: 250_000,
        }
    }
}

/// A coverage answer and whether it came from the cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageReport {
    /// Explored share of the region, `0..=100`.
    pub percent: f64,
    /// `true` when served from the cache without a grid walk.
    pub cached: bool,
}

/// Computes and caches per-region coverage.
#[derive(Debug, Default)]
pub struct CoverageEstimator {
    config: CoverageConfig,
    cache: CoverageCache,
}

impl CoverageEstimator {
    /// Creates an estimator with an empty cache.
    #[must_use]
    pub fn new(config: CoverageConfig) -> Self {
        Self {
            config,
            cache: CoverageCache::new(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// The underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &CoverageCache {
        &self.cache
    }

    /// Coverage of `region` by the points in `snapshot`.
    #[must_use]
    pub fn coverage(&self, region: &Region, snapshot: &LedgerSnapshot) -> CoverageReport {
        if let Some(percent) = self.cache.lookup(region.name(), snapshot) {
            return CoverageReport {
                percent,
                cached: true,
            };
        }

        let percent = if snapshot.is_empty() {
            0.0
        } else {
            let result = estimate(region.boundary(), snapshot.iter(), &self.config);
            log::debug!(
                "{} coverage for {}: {:.2}% ({}/{} samples, {} local points of {})",
                snapshot.mode(),
                region.name(),
                result.percent,
                result.explored_samples,
                result.total_samples,
                result.local_points,
                snapshot.len()
            );
            result.percent
        };

        self.cache.store(region.name(), snapshot, percent);

        CoverageReport {
            percent,
            cached: false,
        }
    }

    /// Shorthand for [`coverage`](Self::coverage) returning only the
    /// percentage.
    #[must_use]
    pub fn coverage_percent(&self, region: &Region, snapshot: &LedgerSnapshot) -> f64 {
        self.coverage(region, snapshot).percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fog_map_geography_models::Coordinate;
    use fog_map_ledger::VisitLedgers;
    use fog_map_ledger_models::{LocationEvent, VisitMode};
    use fog_map_neighborhood::RegionCatalog;

    fn walk(ledgers: &VisitLedgers, lat: f64, lon: f64) {
        ledgers.admit(
            VisitMode::Explore,
            &LocationEvent::new(Coordinate::new(lat, lon)).walking(true),
        );
    }

    #[test]
    fn empty_ledger_is_zero() {
        let catalog = RegionCatalog::embedded();
        let region = catalog.region_named("Park Slope").unwrap();
        let estimator = CoverageEstimator::default();
        let ledgers = VisitLedgers::default();

        let report = estimator.coverage(region, &ledgers.snapshot(VisitMode::Explore));
        assert!(report.percent.abs() < f64::EPSILON);
        assert!(!report.cached);
    }

    #[test]
    fn repeated_queries_are_bit_identical_and_cached() {
        let catalog = RegionCatalog::embedded();
        let region = catalog.region_named("Prospect Park").unwrap();
        let estimator = CoverageEstimator::default();
        let ledgers = VisitLedgers::default();
        walk(&ledgers, 40.6602, -73.9690);
        walk(&ledgers, 40.6612, -73.9690);

        let first = estimator.coverage(region, &ledgers.snapshot(VisitMode::Explore));
        let second = estimator.coverage(region, &ledgers.snapshot(VisitMode::Explore));

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.percent.to_bits(), second.percent.to_bits());
        assert!(first.percent > 0.0);
    }

    #[test]
    fn admit_forces_recompute_with_new_length() {
        let catalog = RegionCatalog::embedded();
        let region = catalog.region_named("Prospect Park").unwrap();
        let estimator = CoverageEstimator::default();
        let ledgers = VisitLedgers::default();
        walk(&ledgers, 40.6602, -73.9690);

        let before = estimator.coverage(region, &ledgers.snapshot(VisitMode::Explore));
        walk(&ledgers, 40.6650, -73.9660);
        let after = estimator.coverage(region, &ledgers.snapshot(VisitMode::Explore));

        assert!(!after.cached);
        assert!(after.percent > before.percent);
    }

    #[test]
    fn points_outside_region_leave_it_at_zero() {
        let catalog = RegionCatalog::embedded();
        let region = catalog.region_named("Park Slope").unwrap();
        let estimator = CoverageEstimator::default();
        let ledgers = VisitLedgers::default();
        walk(&ledgers, 40.6602, -73.9690);

        assert!(estimator
            .coverage_percent(region, &ledgers.snapshot(VisitMode::Explore))
            .abs()
            < f64::EPSILON);
    }
}
