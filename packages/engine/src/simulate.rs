//! Synthetic walk used by test mode.
//!
//! Starting from a coordinate, each tick moves a fixed distance toward the
//! target, split between latitude and longitude in proportion to the
//! remaining deltas. The walk ends once both deltas are within the
//! tolerance.

use fog_map_geography_models::Coordinate;

/// Default destination: the middle of Prospect Park.
pub const DEFAULT_TARGET: Coordinate = Coordinate::new(40.6602, -73.9690);

/// Default start when no current location is known (Times Square).
pub const DEFAULT_START: Coordinate = Coordinate::new(40.7580, -73.9855);

/// Distance moved per tick, in degrees (about 40 m).
pub const STEP_DEGREES: f64 = 0.000_36;

/// The walk stops once both deltas are at most this many degrees.
pub const ARRIVAL_TOLERANCE_DEGREES: f64 = 0.0001;

/// Iterator over the positions of a simulated walk, excluding the start.
#[derive(Debug, Clone)]
pub struct WalkSimulator {
    position: Coordinate,
    target: Coordinate,
    step: f64,
    tolerance: f64,
}

impl WalkSimulator {
    /// Walks from `start` to `target` with the default step and tolerance.
    #[must_use]
    pub const fn new(start: Coordinate, target: Coordinate) -> Self {
        Self {
            position: start,
            target,
            step: STEP_DEGREES,
            tolerance: ARRIVAL_TOLERANCE_DEGREES,
        }
    }

    /// Walks from `start` to [`DEFAULT_TARGET`].
    #[must_use]
    pub const fn toward_default_target(start: Coordinate) -> Self {
        Self::new(start, DEFAULT_TARGET)
    }

    /// Overrides the per-tick step.
    #[must_use]
    pub const fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Coordinate {
        self.position
    }

    /// Returns `true` once the position is within tolerance of the target.
    #[must_use]
    pub fn arrived(&self) -> bool {
        let d_lat = self.target.latitude - self.position.latitude;
        let d_lon = self.target.longitude - self.position.longitude;
        !(d_lat.abs() > self.tolerance || d_lon.abs() > self.tolerance)
    }
}

impl Iterator for WalkSimulator {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        if self.arrived() || !self.step.is_finite() || self.step <= 0.0 {
            return None;
        }

        let d_lat = self.target.latitude - self.position.latitude;
        let d_lon = self.target.longitude - self.position.longitude;
        let total = d_lat.abs() + d_lon.abs();

        // Land on the target rather than overshoot and oscillate around it.
        self.position = if total <= self.step {
            self.target
        } else {
            Coordinate::new(
                (d_lat / total).mul_add(self.step, self.position.latitude),
                (d_lon / total).mul_add(self.step, self.position.longitude),
            )
        };

        Some(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_reaches_target_and_stops() {
        let start = Coordinate::new(40.6710, -73.9814);
        let mut walk = WalkSimulator::toward_default_target(start);
        let steps = walk.by_ref().count();

        assert!(steps > 10);
        assert!(walk.arrived());
        assert!(walk.next().is_none());
    }

    #[test]
    fn each_tick_moves_one_step_in_manhattan_distance() {
        let start = Coordinate::new(0.0, 0.0);
        let first = WalkSimulator::new(start, Coordinate::new(0.003, 0.001))
            .next()
            .unwrap();

        let moved = first.latitude.abs() + first.longitude.abs();
        assert!((moved - STEP_DEGREES).abs() < 1e-12);
        assert!((first.latitude / first.longitude - 3.0).abs() < 1e-9);
    }

    #[test]
    fn starting_at_target_yields_nothing() {
        assert_eq!(WalkSimulator::new(DEFAULT_TARGET, DEFAULT_TARGET).count(), 0);
    }

    #[test]
    fn short_remaining_distance_lands_exactly() {
        let target = Coordinate::new(0.0002, 0.0);
        let points: Vec<_> = WalkSimulator::new(Coordinate::new(0.0, 0.0), target).collect();
        assert_eq!(points, vec![target]);
    }
}
