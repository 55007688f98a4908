#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial indexes for the exploration engine.
//!
//! [`BoundaryIndex`] is an R-tree over region bounding boxes used to
//! resolve a point to the first containing region without scanning every
//! boundary. [`PointBuckets`] is a uniform grid over visited points that
//! bounds the proximity search done for every coverage sample.

use std::collections::BTreeMap;

use fog_map_geography::contains;
use fog_map_geography_models::{Coordinate, Polygon};
use rstar::{AABB, RTree, RTreeObject};

/// A boundary polygon stored in the R-tree with its catalog position.
struct BoundaryEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over boundary polygons, keyed by their position in the input.
///
/// Envelopes are `[longitude, latitude]`. Lookups return the lowest
/// position among all containing boundaries, so results match a linear
/// first-match scan regardless of tree layout.
pub struct BoundaryIndex {
    tree: RTree<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Builds the index. Each boundary is identified by its position in
    /// `boundaries`. Empty polygons are skipped.
    #[must_use]
    pub fn build<'a>(boundaries: impl IntoIterator<Item = &'a Polygon>) -> Self {
        let entries: Vec<BoundaryEntry> = boundaries
            .into_iter()
            .enumerate()
            .filter_map(|(index, polygon)| {
                let Some(bbox) = polygon.bounding_box() else {
                    log::warn!("Skipping empty boundary at position {index}");
                    return None;
                };
                Some(BoundaryEntry {
                    index,
                    envelope: AABB::from_corners(
                        [bbox.min_longitude, bbox.min_latitude],
                        [bbox.max_longitude, bbox.max_latitude],
                    ),
                    polygon: polygon.clone(),
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed boundaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if no boundaries are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Position of the first boundary (in input order) containing `point`.
    #[must_use]
    pub fn lookup_first(&self, point: Coordinate) -> Option<usize> {
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| contains(point, &entry.polygon))
            .map(|entry| entry.index)
            .min()
    }
}

/// A uniform square grid of visited points.
///
/// Each point lands in exactly one cell, found by floor-dividing its
/// latitude and longitude by the cell size. A proximity query only has to
/// look at the query's own cell and its eight neighbours, as long as the
/// search radius does not exceed the cell size.
#[derive(Debug, Clone)]
pub struct PointBuckets {
    cell_size: f64,
    cells: BTreeMap<(i64, i64), Vec<Coordinate>>,
    len: usize,
}

impl PointBuckets {
    /// Creates an empty grid. Returns `None` unless `cell_size` is finite
    /// and positive.
    #[must_use]
    pub fn new(cell_size: f64) -> Option<Self> {
        (cell_size.is_finite() && cell_size > 0.0).then(|| Self {
            cell_size,
            cells: BTreeMap::new(),
            len: 0,
        })
    }

    /// Creates a grid and inserts every point from `points`.
    #[must_use]
    pub fn from_points(cell_size: f64, points: impl IntoIterator<Item = Coordinate>) -> Option<Self> {
        let mut buckets = Self::new(cell_size)?;
        for point in points {
            buckets.insert(point);
        }
        Some(buckets)
    }

    /// Side length of each cell in degrees.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Total number of stored points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no points are stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Adds a point to its cell.
    pub fn insert(&mut self, point: Coordinate) {
        let key = self.cell_of(point);
        self.cells.entry(key).or_default().push(point);
        self.len += 1;
    }

    /// Returns `true` if any stored point is within `radius` degrees
    /// (planar distance) of `point`.
    ///
    /// `radius` must not exceed the cell size, otherwise points two cells
    /// away could be missed.
    #[must_use]
    pub fn any_within(&self, point: Coordinate, radius: f64) -> bool {
        debug_assert!(
            radius <= self.cell_size,
            "search radius {radius} exceeds cell size {}",
            self.cell_size
        );

        let (row, col) = self.cell_of(point);

        for d_row in -1..=1_i64 {
            for d_col in -1..=1_i64 {
                let key = (row.saturating_add(d_row), col.saturating_add(d_col));
                let Some(bucket) = self.cells.get(&key) else {
                    continue;
                };
                if bucket
                    .iter()
                    .any(|visited| fog_map_geography::planar_distance(point, *visited) <= radius)
                {
                    return true;
                }
            }
        }

        false
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(&self, point: Coordinate) -> (i64, i64) {
        (
            (point.latitude / self.cell_size).floor() as i64,
            (point.longitude / self.cell_size).floor() as i64,
        )
    }
}
