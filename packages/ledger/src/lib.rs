#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Append-only visit ledgers.
//!
//! One ledger exists per [`VisitMode`]. Samples only enter a ledger through
//! the [`AdmissionPolicy`]; the only way to remove them is [`VisitLedgers::clear`],
//! which empties the ledger and bumps its epoch so that anything derived
//! from the old contents can be recognised as stale.
//!
//! Readers take a [`LedgerSnapshot`]: a shared, immutable view whose length
//! and contents are captured together. Appends after the snapshot was
//! taken never disturb it.

pub mod policy;

use std::sync::{Arc, PoisonError, RwLock};

use fog_map_geography_models::Coordinate;
use fog_map_ledger_models::{Admission, LocationEvent, VisitMode};

pub use policy::AdmissionPolicy;

/// Points per sealed chunk.
pub const CHUNK_LEN: usize = 1024;

/// An immutable view of a ledger at one point in time.
///
/// Holds the ledger's sealed chunks by reference and its partial tail, so
/// taking or keeping a snapshot never copies more than one chunk.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    mode: VisitMode,
    epoch: u64,
    sealed: Arc<Vec<Arc<[Coordinate]>>>,
    tail: Arc<Vec<Coordinate>>,
}

impl LedgerSnapshot {
    /// Mode of the ledger this was taken from.
    #[must_use]
    pub const fn mode(&self) -> VisitMode {
        self.mode
    }

    /// Clear count of the ledger when the snapshot was taken.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of points captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sealed.len() * CHUNK_LEN + self.tail.len()
    }

    /// Returns `true` if the ledger was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sealed.is_empty() && self.tail.is_empty()
    }

    /// The captured points as contiguous runs, in admission order.
    pub fn chunks(&self) -> impl Iterator<Item = &[Coordinate]> {
        self.sealed
            .iter()
            .map(|chunk| &chunk[..])
            .chain(std::iter::once(self.tail.as_slice()))
            .filter(|chunk| !chunk.is_empty())
    }

    /// The captured points in admission order.
    pub fn iter(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.chunks().flatten().copied()
    }

    /// Copies the captured points out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Coordinate> {
        let mut points = Vec::with_capacity(self.len());
        for chunk in self.chunks() {
            points.extend_from_slice(chunk);
        }
        points
    }
}

/// A single mode's ledger.
///
/// Full chunks are sealed into shared slices and never touched again. Only
/// the tail is copy-on-write, so an append while a snapshot is alive copies
/// at most `CHUNK_LEN - 1` points and leaves the snapshot untouched.
#[derive(Debug, Default)]
struct Ledger {
    sealed: Arc<Vec<Arc<[Coordinate]>>>,
    tail: Arc<Vec<Coordinate>>,
    epoch: u64,
}

impl Ledger {
    fn len(&self) -> usize {
        self.sealed.len() * CHUNK_LEN + self.tail.len()
    }

    fn last(&self) -> Option<Coordinate> {
        self.tail
            .last()
            .or_else(|| self.sealed.last().and_then(|chunk| chunk.last()))
            .copied()
    }

    fn push(&mut self, point: Coordinate) -> usize {
        let before = self.len();
        Arc::make_mut(&mut self.tail).push(point);

        if self.tail.len() == CHUNK_LEN {
            let full: Arc<[Coordinate]> = self.tail.as_slice().into();
            Arc::make_mut(&mut self.sealed).push(full);
            self.tail = Arc::new(Vec::with_capacity(CHUNK_LEN));
        }

        debug_assert_eq!(self.len(), before + 1, "ledger append lost a point");
        self.len()
    }

    fn replace(&mut self, points: &[Coordinate]) {
        let mut chunks = points.chunks_exact(CHUNK_LEN);
        self.sealed = Arc::new(chunks.by_ref().map(Arc::from).collect());
        self.tail = Arc::new(chunks.remainder().to_vec());
    }

    fn clear(&mut self) {
        self.sealed = Arc::default();
        self.tail = Arc::default();
        self.epoch += 1;
    }
}

/// The pair of per-mode ledgers plus the policy guarding them.
///
/// Each mode is serialized behind its own lock, so admits for one mode
/// never wait on the other. Locks are only held for the length of an
/// append or a snapshot clone.
#[derive(Debug, Default)]
pub struct VisitLedgers {
    policy: AdmissionPolicy,
    explore: RwLock<Ledger>,
    test: RwLock<Ledger>,
}

impl VisitLedgers {
    /// Creates empty ledgers using `policy`.
    #[must_use]
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            policy,
            explore: RwLock::default(),
            test: RwLock::default(),
        }
    }

    /// The admission policy in force.
    #[must_use]
    pub const fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    const fn ledger(&self, mode: VisitMode) -> &RwLock<Ledger> {
        match mode {
            VisitMode::Explore => &self.explore,
            VisitMode::Test => &self.test,
        }
    }

    /// Offers `event` to the `mode` ledger.
    ///
    /// Evaluation and append happen under one write lock so two concurrent
    /// admits cannot both pass the spacing check against the same point.
    pub fn admit(&self, mode: VisitMode, event: &LocationEvent) -> Admission {
        let mut ledger = self
            .ledger(mode)
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match self.policy.evaluate(mode, ledger.last(), event) {
            Ok(()) => {
                let len = ledger.push(event.coordinate);
                drop(ledger);
                Admission::Admitted { len }
            }
            Err(reason) => {
                drop(ledger);
                log::trace!(
                    "Rejected {mode} sample at ({}, {}): {reason}",
                    event.coordinate.latitude,
                    event.coordinate.longitude
                );
                Admission::Rejected { reason }
            }
        }
    }

    /// Empties the `mode` ledger and advances its epoch. Returns the new
    /// epoch. Clearing an empty ledger still advances the epoch.
    pub fn clear(&self, mode: VisitMode) -> u64 {
        let mut ledger = self
            .ledger(mode)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        ledger.clear();
        ledger.epoch
    }

    /// Seeds an empty ledger with previously persisted points.
    ///
    /// Points bypass the admission policy; they were admitted in an earlier
    /// session. Returns `false` (and leaves the ledger alone) if the ledger
    /// already has points.
    pub fn hydrate(&self, mode: VisitMode, points: &[Coordinate]) -> bool {
        let mut ledger = self
            .ledger(mode)
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if ledger.len() > 0 {
            log::warn!(
                "Refusing to hydrate non-empty {mode} ledger ({} points)",
                ledger.len()
            );
            return false;
        }

        ledger.replace(&points);
        true
    }

    /// Captures the `mode` ledger's current contents.
    #[must_use]
    pub fn snapshot(&self, mode: VisitMode) -> LedgerSnapshot {
        let ledger = self
            .ledger(mode)
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        LedgerSnapshot {
            mode,
            epoch: ledger.epoch,
            sealed: Arc::clone(&ledger.sealed),
            tail: Arc::clone(&ledger.tail),
        }
    }

    /// Current length and epoch of the `mode` ledger.
    #[must_use]
    pub fn version(&self, mode: VisitMode) -> (u64, usize) {
        let ledger = self
            .ledger(mode)
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        (ledger.epoch, ledger.len())
    }

    /// Current length of the `mode` ledger.
    #[must_use]
    pub fn len(&self, mode: VisitMode) -> usize {
        self.version(mode).1
    }

    /// Returns `true` if the `mode` ledger has no points.
    #[must_use]
    pub fn is_empty(&self, mode: VisitMode) -> bool {
        self.len(mode) == 0
    }
}
