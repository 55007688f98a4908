//! Admission policy deciding which samples count as explored.

use fog_map_geography::planar_distance;
use fog_map_geography_models::Coordinate;
use fog_map_ledger_models::{AdmissionThresholds, LocationEvent, RejectReason, VisitMode};

/// Filters raw samples before they reach a ledger.
///
/// Rules, in order:
/// 0. Non-finite coordinates are never admitted.
/// 1. `Test` mode skips the motion gate.
/// 2. `Explore` mode requires the walking/running flag.
/// 3. An empty ledger accepts any sample as its seed point.
/// 4. Otherwise the sample must be farther than the lifecycle-dependent
///    threshold from the last admitted point.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionPolicy {
    thresholds: AdmissionThresholds,
}

impl AdmissionPolicy {
    /// Creates a policy with the given spacing thresholds.
    #[must_use]
    pub const fn new(thresholds: AdmissionThresholds) -> Self {
        Self { thresholds }
    }

    /// The configured thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &AdmissionThresholds {
        &self.thresholds
    }

    /// Evaluates `event` against the ledger whose most recent point is
    /// `last_admitted`.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectReason`] when the sample should be dropped.
    /// Rejection is a normal outcome, not a fault.
    pub fn evaluate(
        &self,
        mode: VisitMode,
        last_admitted: Option<Coordinate>,
        event: &LocationEvent,
    ) -> Result<(), RejectReason> {
        if !event.coordinate.is_finite() {
            return Err(RejectReason::InvalidCoordinate);
        }

        if mode == VisitMode::Explore && !event.is_walking {
            return Err(RejectReason::NotMoving);
        }

        let Some(last) = last_admitted else {
            return Ok(());
        };

        let distance = planar_distance(event.coordinate, last);
        if distance > self.thresholds.min_step(event.is_backgrounded) {
            Ok(())
        } else {
            Err(RejectReason::TooClose)
        }
    }
}
