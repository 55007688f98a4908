#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exploration engine.
//!
//! [`ExplorationEngine`] is the single surface the host app talks to. It
//! resolves coordinates to neighborhood names, feeds location samples
//! through the admission policy into the per-mode ledgers, answers
//! coverage queries from the cached estimator, and keeps the explore
//! ledger persisted.
//!
//! Nothing here surfaces an error to the caller once the engine is built:
//! unknown regions report `0%`, rejected samples are an ordinary outcome,
//! and persistence failures are logged and reported to the
//! [`EngineObserver`].

pub mod config;
pub mod group;
pub mod observer;
pub mod simulate;

use std::sync::Arc;

use fog_map_coverage::CoverageEstimator;
use fog_map_geography_models::Coordinate;
use fog_map_ledger::{AdmissionPolicy, LedgerSnapshot, VisitLedgers};
use fog_map_ledger_models::{Admission, LocationEvent, VisitMode};
use fog_map_neighborhood::RegionCatalog;
use fog_map_neighborhood_models::Region;
use fog_map_persistence::writer::FailureHook;
use fog_map_persistence::{FileStore, KeyValueStore, PersistenceWriter, StoreError, load_ledger};

pub use config::{ConfigError, EngineConfig};
pub use group::RegionCoverage;
pub use observer::{EngineEvent, EngineObserver, LogObserver, NullObserver};
pub use simulate::WalkSimulator;

use group::{RefreshThrottle, sort_by_coverage};

/// Errors building an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The durable store could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Assembles an [`ExplorationEngine`].
pub struct EngineBuilder {
    catalog: Option<RegionCatalog>,
    config: EngineConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    observer: Arc<dyn EngineObserver>,
}

impl EngineBuilder {
    /// Uses `catalog` instead of the embedded one.
    #[must_use]
    pub fn catalog(mut self, catalog: RegionCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Persists the explore ledger to `store`.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sends engine events to `observer`.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Builds the engine, hydrating the explore ledger from the store if
    /// one was given.
    ///
    /// # Panics
    ///
    /// * If a store was given and this is called outside a tokio runtime
    /// * If no catalog was given and the embedded region data is invalid
    #[must_use]
    pub fn build(self) -> ExplorationEngine {
        let Self {
            catalog,
            config,
            store,
            observer,
        } = self;

        let catalog = catalog.unwrap_or_else(RegionCatalog::embedded);
        let ledgers = VisitLedgers::new(AdmissionPolicy::new(config.admission));

        let writer = store.map(|store| {
            let points = load_ledger(store.as_ref());
            if !points.is_empty() {
                ledgers.hydrate(VisitMode::Explore, &points);
            }

            let hook: FailureHook = {
                let observer = Arc::clone(&observer);
                Arc::new(move |error: &StoreError| {
                    observer.on_event(&EngineEvent::FlushFailed {
                        message: error.to_string(),
                    });
                })
            };
            let writer =
                PersistenceWriter::spawn_with_hook(store, config.quiet_period(), Some(hook));
            writer.mark_persisted(&ledgers.snapshot(VisitMode::Explore));
            writer
        });

        log::info!(
            "Exploration engine ready: {} regions, {} explore points, persistence {}",
            catalog.len(),
            ledgers.len(VisitMode::Explore),
            if writer.is_some() { "on" } else { "off" }
        );

        ExplorationEngine {
            catalog,
            ledgers,
            estimator: CoverageEstimator::new(config.coverage),
            writer,
            observer,
            refresh: RefreshThrottle::new(config.min_refresh_interval()),
            config,
        }
    }
}

/// Neighborhood exploration engine.
pub struct ExplorationEngine {
    catalog: RegionCatalog,
    ledgers: VisitLedgers,
    estimator: CoverageEstimator,
    writer: Option<PersistenceWriter>,
    observer: Arc<dyn EngineObserver>,
    refresh: RefreshThrottle,
    config: EngineConfig,
}

impl ExplorationEngine {
    /// Starts building an engine with the embedded catalog, default
    /// config, no persistence, and a [`NullObserver`].
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            catalog: None,
            config: EngineConfig::default(),
            store: None,
            observer: observer::null_observer(),
        }
    }

    /// In-memory engine over the embedded catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Builds an engine from `config`, persisting to a [`FileStore`] in
    /// `config.data_dir` when set.
    ///
    /// # Errors
    ///
    /// * If the config fails validation
    /// * If the data directory cannot be created
    ///
    /// # Panics
    ///
    /// * If a data directory is set and this is called outside a tokio
    ///   runtime
    pub fn open(
        config: EngineConfig,
        observer: Arc<dyn EngineObserver>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let mut builder = Self::builder().observer(observer);
        if let Some(dir) = &config.data_dir {
            builder = builder.store(Arc::new(FileStore::open(dir)?));
        }

        Ok(builder.config(config).build())
    }

    /// The region catalog.
    #[must_use]
    pub const fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Name of the region containing `point`, or the sentinel name when no
    /// region does.
    #[must_use]
    pub fn region_name(&self, point: Coordinate) -> &str {
        self.catalog.region_name_for(point)
    }

    /// Offers a location sample to the `mode` ledger.
    pub fn admit(&self, event: &LocationEvent, mode: VisitMode) -> Admission {
        let admission = self.ledgers.admit(mode, event);

        match admission {
            Admission::Admitted { len } => {
                self.observer.on_event(&EngineEvent::Admitted { mode, len });
                if mode.is_persisted() {
                    self.persist(event.is_backgrounded);
                }
            }
            Admission::Rejected { reason } => {
                self.observer.on_event(&EngineEvent::Rejected { mode, reason });
            }
        }

        admission
    }

    fn persist(&self, immediately: bool) {
        let Some(writer) = &self.writer else {
            return;
        };
        let snapshot = self.ledgers.snapshot(VisitMode::Explore);
        if immediately {
            writer.flush_immediately(&snapshot);
        } else {
            writer.schedule(snapshot);
        }
    }

    /// Empties the `mode` ledger.
    ///
    /// Cached coverage and group listings for the mode are dropped, and
    /// for the explore ledger the persisted record is deleted before this
    /// returns.
    pub fn clear(&self, mode: VisitMode) {
        let epoch = self.ledgers.clear(mode);
        self.estimator.cache().invalidate_mode(mode, epoch);
        self.refresh.forget_mode(mode);

        if mode.is_persisted()
            && let Some(writer) = &self.writer
            && let Err(e) = writer.clear(epoch)
        {
            log::warn!("Failed to delete persisted {mode} ledger, will retry: {e}");
            self.observer.on_event(&EngineEvent::FlushFailed {
                message: e.to_string(),
            });
        }

        self.observer.on_event(&EngineEvent::Cleared { mode, epoch });
    }

    /// Current contents of the `mode` ledger.
    #[must_use]
    pub fn snapshot(&self, mode: VisitMode) -> LedgerSnapshot {
        self.ledgers.snapshot(mode)
    }

    /// Number of points in the `mode` ledger.
    #[must_use]
    pub fn ledger_len(&self, mode: VisitMode) -> usize {
        self.ledgers.len(mode)
    }

    /// Explored percentage of the region named `region` in `mode`.
    ///
    /// Unknown names report `0`.
    #[must_use]
    pub fn coverage_percent(&self, region: &str, mode: VisitMode) -> f64 {
        let Some(region) = self.catalog.region_named(region) else {
            log::debug!("Coverage requested for unknown region {region:?}");
            return 0.0;
        };
        self.region_coverage(region, &self.ledgers.snapshot(mode))
    }

    fn region_coverage(&self, region: &Region, snapshot: &LedgerSnapshot) -> f64 {
        let report = self.estimator.coverage(region, snapshot);
        if !report.cached {
            self.observer.on_event(&EngineEvent::CoverageComputed {
                region: region.name().to_string(),
                mode: snapshot.mode(),
                percent: report.percent,
            });
        }
        report.percent
    }

    /// [`coverage_percent`](Self::coverage_percent) on the blocking pool so
    /// the grid walk never stalls the async caller.
    pub async fn coverage_percent_async(self: Arc<Self>, region: String, mode: VisitMode) -> f64 {
        match tokio::task::spawn_blocking(move || self.coverage_percent(&region, mode)).await {
            Ok(percent) => percent,
            Err(e) => {
                log::error!("Coverage task failed: {e}");
                0.0
            }
        }
    }

    /// Coverage of every region tagged `borough`, highest first.
    ///
    /// All regions are measured against the same ledger snapshot.
    #[must_use]
    pub fn coverage_for_group(&self, borough: &str, mode: VisitMode) -> Vec<RegionCoverage> {
        let snapshot = self.ledgers.snapshot(mode);
        let mut results: Vec<_> = self
            .catalog
            .regions_in_group(borough)
            .map(|region| RegionCoverage {
                name: region.name().to_string(),
                borough: region.borough().map(str::to_string),
                percent: self.region_coverage(region, &snapshot),
            })
            .collect();

        sort_by_coverage(&mut results);
        results
    }

    /// Like [`coverage_for_group`](Self::coverage_for_group), but returns
    /// the previous listing unless `force` is set or the ledger changed and
    /// the minimum refresh interval has passed.
    #[must_use]
    pub fn refresh_group(&self, borough: &str, mode: VisitMode, force: bool) -> Vec<RegionCoverage> {
        let version = self.ledgers.version(mode);
        if let Some(previous) = self.refresh.reuse(borough, mode, version, force) {
            return previous;
        }

        let results = self.coverage_for_group(borough, mode);
        self.refresh.record(borough, mode, version, results.clone());
        results
    }

    /// Writes any pending explore flush and waits for it.
    pub async fn flush_now(&self) {
        if let Some(writer) = &self.writer {
            writer.flush_now().await;
        }
    }
}

impl Default for ExplorationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fog_map_geography_models::Polygon;
    use fog_map_ledger_models::RejectReason;
    use fog_map_neighborhood::UNKNOWN_REGION_NAME;
    use fog_map_persistence::{EXPLORE_LEDGER_KEY, MemoryStore};

    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<EngineEvent>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<EngineEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EngineObserver for RecordingObserver {
        fn on_event(&self, event: &EngineEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn square_catalog() -> RegionCatalog {
        let boundary: Polygon = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.01),
            Coordinate::new(0.01, 0.01),
            Coordinate::new(0.01, 0.0),
        ]
        .into();
        RegionCatalog::from_regions(vec![Region::new(
            "R".to_string(),
            Some("Equator".to_string()),
            boundary,
        )])
        .unwrap()
    }

    fn walking(lat: f64, lon: f64) -> LocationEvent {
        LocationEvent::new(Coordinate::new(lat, lon)).walking(true)
    }

    #[test]
    fn resolves_region_names_with_sentinel_fallback() {
        let engine = ExplorationEngine::new();
        assert_eq!(engine.region_name(Coordinate::new(40.6710, -73.9814)), "Park Slope");
        assert_eq!(engine.region_name(Coordinate::new(40.6602, -73.9690)), "Prospect Park");
        assert_eq!(engine.region_name(Coordinate::new(35.0, -40.0)), UNKNOWN_REGION_NAME);
    }

    #[test]
    fn unknown_region_reports_zero() {
        let engine = ExplorationEngine::new();
        engine.admit(&walking(40.6602, -73.9690), VisitMode::Explore);
        assert!(engine.coverage_percent("Atlantis", VisitMode::Explore).abs() < f64::EPSILON);
        assert!(engine.coverage_percent("New York", VisitMode::Explore).abs() < f64::EPSILON);
    }

    #[test]
    fn equator_square_single_point_and_dense_cover() {
        let engine = ExplorationEngine::builder().catalog(square_catalog()).build();

        engine.admit(&walking(0.005, 0.005), VisitMode::Explore);
        let single = engine.coverage_percent("R", VisitMode::Explore);
        assert!(single > 0.0 && single < 100.0, "{single}");

        let mut lat = 0.000_125;
        while lat < 0.01 {
            let mut lon = 0.000_125;
            while lon < 0.01 {
                engine.admit(&walking(lat, lon), VisitMode::Explore);
                lon += 0.000_25;
            }
            lat += 0.000_25;
        }

        let dense = engine.coverage_percent("R", VisitMode::Explore);
        assert!(dense >= 95.0, "{dense}");
        assert!(dense <= 100.0);
    }

    #[test]
    fn explore_requires_motion_but_test_does_not() {
        let engine = ExplorationEngine::new();
        let still = LocationEvent::new(Coordinate::new(40.6710, -73.9814));

        assert_eq!(
            engine.admit(&still, VisitMode::Explore),
            Admission::Rejected {
                reason: RejectReason::NotMoving
            }
        );
        assert_eq!(engine.admit(&still, VisitMode::Test), Admission::Admitted { len: 1 });
        assert_eq!(engine.ledger_len(VisitMode::Explore), 0);
    }

    #[test]
    fn clear_is_idempotent_and_zeroes_coverage() {
        let engine = ExplorationEngine::new();
        engine.admit(&walking(40.6602, -73.9690), VisitMode::Test);
        assert!(engine.coverage_percent("Prospect Park", VisitMode::Test) > 0.0);

        engine.clear(VisitMode::Test);
        engine.clear(VisitMode::Test);

        assert_eq!(engine.ledger_len(VisitMode::Test), 0);
        assert!(engine.coverage_percent("Prospect Park", VisitMode::Test).abs() < f64::EPSILON);
    }

    #[test]
    fn coverage_grows_along_a_walk() {
        let engine = ExplorationEngine::new();
        let start = Coordinate::new(40.6710, -73.9814);
        let mut last = 0.0;

        for point in WalkSimulator::toward_default_target(start) {
            engine.admit(&LocationEvent::new(point), VisitMode::Test);
            let percent = engine.coverage_percent("Prospect Park", VisitMode::Test);
            assert!(percent >= last, "coverage dropped from {last} to {percent}");
            last = percent;
        }

        assert!(last > 0.0);
    }

    #[test]
    fn group_listing_is_sorted_descending() {
        let engine = ExplorationEngine::new();
        engine.admit(&walking(40.6602, -73.9690), VisitMode::Explore);
        engine.admit(&walking(40.6612, -73.9690), VisitMode::Explore);

        let listing = engine.coverage_for_group("Brooklyn", VisitMode::Explore);
        assert_eq!(listing.len(), 35);
        assert_eq!(listing[0].name, "Prospect Park");
        assert!(listing.windows(2).all(|w| w[0].percent >= w[1].percent));
        assert!(engine.coverage_for_group("Queens", VisitMode::Explore).is_empty());
    }

    #[test]
    fn refresh_group_is_throttled_until_forced() {
        let engine = ExplorationEngine::builder()
            .config(EngineConfig {
                min_refresh_interval_secs: 3600,
                ..EngineConfig::default()
            })
            .build();

        let first = engine.refresh_group("Brooklyn", VisitMode::Test, false);
        assert!(first.iter().all(|r| r.percent.abs() < f64::EPSILON));

        engine.admit(&walking(40.6602, -73.9690), VisitMode::Test);
        assert_eq!(engine.refresh_group("Brooklyn", VisitMode::Test, false), first);

        let forced = engine.refresh_group("Brooklyn", VisitMode::Test, true);
        assert_eq!(forced[0].name, "Prospect Park");
        assert!(forced[0].percent > 0.0);

        engine.clear(VisitMode::Test);
        let after_clear = engine.refresh_group("Brooklyn", VisitMode::Test, false);
        assert!(after_clear.iter().all(|r| r.percent.abs() < f64::EPSILON));
    }

    #[test]
    fn observer_sees_engine_activity() {
        let recorder = Arc::new(RecordingObserver::default());
        let engine = ExplorationEngine::builder()
            .observer(recorder.clone())
            .build();

        engine.admit(&walking(40.6602, -73.9690), VisitMode::Explore);
        engine.admit(&walking(40.6602, -73.9690), VisitMode::Explore);
        let _ = engine.coverage_percent("Prospect Park", VisitMode::Explore);
        let _ = engine.coverage_percent("Prospect Park", VisitMode::Explore);
        engine.clear(VisitMode::Explore);

        let events = recorder.events();
        assert_eq!(
            events[..2],
            [
                EngineEvent::Admitted {
                    mode: VisitMode::Explore,
                    len: 1
                },
                EngineEvent::Rejected {
                    mode: VisitMode::Explore,
                    reason: RejectReason::TooClose
                },
            ]
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, EngineEvent::CoverageComputed { .. }))
                .count(),
            1
        );
        assert_eq!(
            events.last(),
            Some(&EngineEvent::Cleared {
                mode: VisitMode::Explore,
                epoch: 1
            })
        );
    }

    #[tokio::test]
    async fn async_coverage_matches_sync() {
        let engine = Arc::new(ExplorationEngine::new());
        engine.admit(&walking(40.6602, -73.9690), VisitMode::Explore);

        let sync = engine.coverage_percent("Prospect Park", VisitMode::Explore);
        let from_task = Arc::clone(&engine)
            .coverage_percent_async("Prospect Park".to_string(), VisitMode::Explore)
            .await;
        assert_eq!(sync.to_bits(), from_task.to_bits());
    }

    #[tokio::test]
    async fn explore_ledger_survives_restart() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let original = {
            let engine = ExplorationEngine::builder().store(Arc::clone(&store)).build();
            engine.admit(&walking(40.6602, -73.9690), VisitMode::Explore);
            engine.admit(&walking(40.6612, -73.9680), VisitMode::Explore);
            engine.admit(&walking(40.6602, -73.9690), VisitMode::Test);
            engine.flush_now().await;
            engine.snapshot(VisitMode::Explore)
        };

        let restarted = ExplorationEngine::builder().store(Arc::clone(&store)).build();
        assert_eq!(
            restarted.snapshot(VisitMode::Explore).to_vec(),
            original.to_vec()
        );
        assert_eq!(restarted.ledger_len(VisitMode::Test), 0);
    }

    #[tokio::test]
    async fn background_admit_persists_before_returning() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let engine = ExplorationEngine::builder().store(Arc::clone(&store)).build();

        engine.admit(
            &walking(40.6602, -73.9690).backgrounded(true),
            VisitMode::Explore,
        );
        assert_eq!(load_ledger(store.as_ref()).len(), 1);
    }

    #[tokio::test]
    async fn clear_deletes_persisted_ledger() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let engine = ExplorationEngine::builder().store(Arc::clone(&store)).build();

        engine.admit(&walking(40.6602, -73.9690), VisitMode::Explore);
        engine.clear(VisitMode::Explore);
        engine.flush_now().await;

        assert!(store.get(EXPLORE_LEDGER_KEY).unwrap().is_none());
        let restarted = ExplorationEngine::builder().store(store).build();
        assert_eq!(restarted.ledger_len(VisitMode::Explore), 0);
    }

    #[test]
    fn open_rejects_invalid_config() {
        let config = EngineConfig {
            quiet_period_ms: 10,
            coverage: fog_map_coverage::CoverageConfig {
                sample_step_degrees: -1.0,
                ..Default::default()
            },
            ..EngineConfig::default()
        };
        assert!(matches!(
            ExplorationEngine::open(config, observer::null_observer()),
            Err(EngineError::Config(_))
        ));
    }
}
