//! Sampling-grid coverage estimate for a single boundary.

use fog_map_geography::{average_latitude, contains, meters_to_longitude_degrees};
use fog_map_geography_models::{Coordinate, Polygon};
use fog_map_spatial::PointBuckets;

use crate::CoverageConfig;

/// Result of one grid walk.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoverageEstimate {
    /// Visited points that fall inside the boundary.
    pub local_points: usize,
    /// Grid samples inside the boundary.
    pub total_samples: u64,
    /// Inside samples within the visibility radius of a visited point.
    pub explored_samples: u64,
    /// `explored_samples / total_samples * 100`, or `0` with no samples.
    pub percent: f64,
}

impl CoverageEstimate {
    #[allow(clippy::cast_precision_loss)]
    fn finish(local_points: usize, total_samples: u64, explored_samples: u64) -> Self {
        let percent = if total_samples > 0 {
            explored_samples as f64 / total_samples as f64 * 100.0
        } else {
            0.0
        };

        Self {
            local_points,
            total_samples,
            explored_samples,
            percent: percent.clamp(0.0, 100.0),
        }
    }
}

/// Estimates how much of `boundary` lies within the visibility radius of
/// any point in `visited`.
///
/// Visited points outside the boundary are ignored. The remaining points
/// are bucketed into cells twice the radius wide, then a uniform grid over
/// the boundary's bounding box is walked; each inside sample only checks
/// its own cell and the eight around it.
#[must_use]
pub fn estimate(
    boundary: &Polygon,
    visited: impl IntoIterator<Item = Coordinate>,
    config: &CoverageConfig,
) -> CoverageEstimate {
    let local: Vec<Coordinate> = visited
        .into_iter()
        .filter(|point| contains(*point, boundary))
        .collect();

    if local.is_empty() {
        return CoverageEstimate::default();
    }

    let Some(radius) = average_latitude(boundary)
        .and_then(|lat| meters_to_longitude_degrees(config.visibility_radius_meters, lat))
        .filter(|r| *r > 0.0)
    else {
        log::warn!("Visibility radius degenerates for this boundary, reporting no coverage");
        return CoverageEstimate::finish(local.len(), 0, 0);
    };

    let Some(buckets) = PointBuckets::from_points(radius * 2.0, local.iter().copied()) else {
        return CoverageEstimate::finish(local.len(), 0, 0);
    };

    let Some(grid) = SampleGrid::new(boundary, config) else {
        return CoverageEstimate::finish(local.len(), 0, 0);
    };

    let mut total_samples = 0_u64;
    let mut explored_samples = 0_u64;

    for sample in grid.samples() {
        if !contains(sample, boundary) {
            continue;
        }
        total_samples += 1;
        if buckets.any_within(sample, radius) {
            explored_samples += 1;
        }
    }

    CoverageEstimate::finish(local.len(), total_samples, explored_samples)
}

/// A uniform lattice over a bounding box.
#[derive(Debug, Clone, Copy)]
struct SampleGrid {
    origin: Coordinate,
    step: f64,
    rows: u64,
    cols: u64,
}

impl SampleGrid {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn new(boundary: &Polygon, config: &CoverageConfig) -> Option<Self> {
        let bbox = boundary.bounding_box()?;
        let mut step = config.sample_step_degrees;
        if !step.is_finite() || step <= 0.0 {
            return None;
        }

        let count = |step: f64| {
            let rows = (bbox.latitude_span() / step).floor() as u64 + 1;
            let cols = (bbox.longitude_span() / step).floor() as u64 + 1;
            (rows, cols)
        };

        let (mut rows, mut cols) = count(step);
        let max = config.max_grid_samples.max(1);
        let total = rows.saturating_mul(cols);

        if total > max {
            step *= (total as f64 / max as f64).sqrt();
            (rows, cols) = count(step);
            log::debug!(
                "Widened sample step to {step} degrees to stay under {max} samples ({rows}x{cols})"
            );
        }

        Some(Self {
            origin: Coordinate::new(bbox.min_latitude, bbox.min_longitude),
            step,
            rows,
            cols,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn samples(self) -> impl Iterator<Item = Coordinate> {
        (0..self.rows).flat_map(move |row| {
            let latitude = (row as f64).mul_add(self.step, self.origin.latitude);
            (0..self.cols).map(move |col| {
                Coordinate::new(
                    latitude,
                    (col as f64).mul_add(self.step, self.origin.longitude),
                )
            })
        })
    }
}
