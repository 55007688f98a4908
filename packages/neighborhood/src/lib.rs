#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Compiled-in catalog of named neighborhood boundaries.
//!
//! Boundaries are defined as TOML files embedded at compile time (one per
//! borough), parsed once at startup into an immutable [`RegionCatalog`].
//! The catalog resolves a coordinate to the first region containing it in
//! declaration order, looks regions up by name or group, and can export
//! its boundaries as `GeoJSON` for the map layer.

pub mod catalog;
pub mod export;
pub mod registry;

pub use catalog::RegionCatalog;
pub use fog_map_neighborhood_models::Region;

use thiserror::Error;

/// Name reported for coordinates that fall outside every catalogued region.
pub const UNKNOWN_REGION_NAME: &str = "New York";

/// Errors that can occur while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A boundary file failed to parse.
    #[error("Failed to parse region source '{source_name}': {error}")]
    Parse {
        /// Identifier of the offending source.
        source_name: String,
        /// Underlying TOML error.
        error: toml::de::Error,
    },

    /// Two regions share a name.
    #[error("Duplicate region name: {name}")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A region's boundary cannot enclose any area.
    #[error("Region '{name}' has {vertices} boundary vertices, expected at least 3")]
    DegenerateBoundary {
        /// Region name.
        name: String,
        /// Number of vertices found.
        vertices: usize,
    },
}
