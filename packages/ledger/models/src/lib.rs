#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Visit ledger types.
//!
//! [`VisitMode`] selects one of the two independent ledgers,
//! [`LocationEvent`] is the raw sample delivered by the platform, and
//! [`Admission`] is the admission policy's verdict on it.

use chrono::{DateTime, Utc};
use fog_map_geography_models::Coordinate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which ledger a sample belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VisitMode {
    /// Real movement, motion-gated and persisted.
    Explore,
    /// Synthetic walk-through, never persisted.
    Test,
}

impl VisitMode {
    /// Every mode, in a stable order.
    pub const ALL: [Self; 2] = [Self::Explore, Self::Test];

    /// Returns `true` if this mode's ledger is written to durable storage.
    #[must_use]
    pub const fn is_persisted(self) -> bool {
        matches!(self, Self::Explore)
    }
}

/// A raw location sample plus the motion and lifecycle state read at the
/// time it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    /// Reported position.
    pub coordinate: Coordinate,
    /// Ground speed in meters per second, `None` when the platform could
    /// not determine it.
    #[serde(default)]
    pub speed: Option<f64>,
    /// When the fix was taken.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Motion classifier says the user is walking or running.
    #[serde(default)]
    pub is_walking: bool,
    /// The host app is in the background.
    #[serde(default)]
    pub is_backgrounded: bool,
}

impl LocationEvent {
    /// Creates a foreground, stationary event at `coordinate` stamped now.
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            speed: None,
            timestamp: Utc::now(),
            is_walking: false,
            is_backgrounded: false,
        }
    }

    /// Sets the motion flag.
    #[must_use]
    pub const fn walking(mut self, is_walking: bool) -> Self {
        self.is_walking = is_walking;
        self
    }

    /// Sets the background flag.
    #[must_use]
    pub const fn backgrounded(mut self, is_backgrounded: bool) -> Self {
        self.is_backgrounded = is_backgrounded;
        self
    }

    /// Sets the reported speed. Negative values mean "unknown".
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = (speed >= 0.0).then_some(speed);
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Why a sample was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Latitude or longitude is NaN or infinite.
    InvalidCoordinate,
    /// Explore mode and the user is not walking or running.
    NotMoving,
    /// Too close to the last admitted point.
    TooClose,
}

/// Outcome of offering a sample to a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Admission {
    /// The sample was appended; `len` is the new ledger length.
    Admitted {
        /// Ledger length after the append.
        len: usize,
    },
    /// The sample was dropped.
    Rejected {
        /// Which rule declined it.
        reason: RejectReason,
    },
}

impl Admission {
    /// Returns `true` if the ledger was mutated.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// Minimum planar spacing (degrees) between consecutive admitted points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AdmissionThresholds {
    /// Spacing required while the app is in the foreground.
    pub foreground_min_step_degrees: f64,
    /// Coarser spacing used while backgrounded.
    pub background_min_step_degrees: f64,
}

impl AdmissionThresholds {
    /// Threshold for the given lifecycle state.
    #[must_use]
    pub const fn min_step(&self, is_backgrounded: bool) -> f64 {
        if is_backgrounded {
            self.background_min_step_degrees
        } else {
            self.foreground_min_step_degrees
        }
    }
}

impl Default for AdmissionThresholds {
    fn default() -> Self {
        Self {
            foreground_min_step_degrees: 0.0001,
            background_min_step_degrees: 0.0003,
        }
    }
}
