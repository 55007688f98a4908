#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood region definition types.
//!
//! Defines the TOML schema for embedded boundary files and the immutable
//! [`Region`] type the catalog hands out after parsing.

use fog_map_geography_models::{Coordinate, Polygon};
use serde::{Deserialize, Serialize};

/// One embedded boundary file, deserialized from TOML.
///
/// A file usually covers a single borough; the file-level `borough` is
/// applied to every region that does not set its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSource {
    /// Default group tag for regions in this file.
    #[serde(default)]
    pub borough: Option<String>,
    /// Region definitions in catalog order.
    #[serde(default)]
    pub regions: Vec<RegionDefinition>,
}

/// A single region as written in a boundary file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDefinition {
    /// Unique display name (e.g., `"Park Slope"`).
    pub name: String,
    /// Group tag overriding the file-level borough.
    #[serde(default)]
    pub borough: Option<String>,
    /// Boundary ring as `[latitude, longitude]` pairs.
    pub boundary: Vec<[f64; 2]>,
}

impl RegionDefinition {
    /// Converts the definition into a [`Region`], falling back to
    /// `default_borough` when the definition has none.
    #[must_use]
    pub fn into_region(self, default_borough: Option<&str>) -> Region {
        let borough = self.borough.or_else(|| default_borough.map(str::to_string));
        let boundary: Polygon = self.boundary.into_iter().map(Coordinate::from).collect();

        Region {
            name: self.name,
            borough,
            boundary,
        }
    }
}

/// A named polygonal area of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    name: String,
    borough: Option<String>,
    boundary: Polygon,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub const fn new(name: String, borough: Option<String>, boundary: Polygon) -> Self {
        Self {
            name,
            borough,
            boundary,
        }
    }

    /// Returns the region's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the group tag, if any.
    #[must_use]
    pub fn borough(&self) -> Option<&str> {
        self.borough.as_deref()
    }

    /// Returns the boundary ring.
    #[must_use]
    pub const fn boundary(&self) -> &Polygon {
        &self.boundary
    }
}
