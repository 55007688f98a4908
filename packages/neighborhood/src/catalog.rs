//! The immutable region catalog.

use std::collections::{BTreeMap, BTreeSet};

use fog_map_geography_models::Coordinate;
use fog_map_neighborhood_models::{Region, RegionSource};
use fog_map_spatial::BoundaryIndex;

use crate::{CatalogError, UNKNOWN_REGION_NAME, registry};

/// An ordered, immutable set of named regions.
///
/// Order is significant: when boundaries overlap, the region declared
/// first wins point resolution.
pub struct RegionCatalog {
    regions: Vec<Region>,
    by_name: BTreeMap<String, usize>,
    index: BoundaryIndex,
}

impl RegionCatalog {
    /// Builds the catalog from the boundary files embedded in this crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded data is invalid. The registry tests guard
    /// against this.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_sources(registry::all_sources())
            .unwrap_or_else(|e| panic!("Embedded region catalog is invalid: {e}"))
    }

    /// Parses TOML boundary files, given as `(name, content)` pairs, and
    /// builds a catalog from them.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if any file fails to parse or the combined
    /// regions are invalid.
    pub fn from_toml_sources(tomls: &[(&str, &str)]) -> Result<Self, CatalogError> {
        let sources = tomls
            .iter()
            .map(|(name, content)| {
                toml::de::from_str::<RegionSource>(content).map_err(|error| CatalogError::Parse {
                    source_name: (*name).to_string(),
                    error,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_sources(sources)
    }

    /// Builds a catalog from parsed sources, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on duplicate names or boundaries with fewer
    /// than three vertices.
    pub fn from_sources(sources: Vec<RegionSource>) -> Result<Self, CatalogError> {
        let regions = sources
            .into_iter()
            .flat_map(|source| {
                let borough = source.borough;
                source
                    .regions
                    .into_iter()
                    .map(move |def| def.into_region(borough.as_deref()))
            })
            .collect();

        Self::from_regions(regions)
    }

    /// Builds a catalog from regions in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on duplicate names or boundaries with fewer
    /// than three vertices.
    pub fn from_regions(regions: Vec<Region>) -> Result<Self, CatalogError> {
        let mut by_name = BTreeMap::new();

        for (position, region) in regions.iter().enumerate() {
            if !region.boundary().is_closed_ring() {
                return Err(CatalogError::DegenerateBoundary {
                    name: region.name().to_string(),
                    vertices: region.boundary().len(),
                });
            }
            if by_name.insert(region.name().to_string(), position).is_some() {
                return Err(CatalogError::DuplicateName {
                    name: region.name().to_string(),
                });
            }
        }

        let index = BoundaryIndex::build(regions.iter().map(Region::boundary));
        log::info!("Loaded {} regions into catalog", regions.len());

        Ok(Self {
            regions,
            by_name,
            index,
        })
    }

    /// All regions in catalog order.
    #[must_use]
    pub fn all_regions(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if the catalog has no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// First region in catalog order whose boundary contains `point`.
    #[must_use]
    pub fn region_containing(&self, point: Coordinate) -> Option<&Region> {
        self.index
            .lookup_first(point)
            .and_then(|position| self.regions.get(position))
    }

    /// Name of the region containing `point`, or [`UNKNOWN_REGION_NAME`].
    #[must_use]
    pub fn region_name_for(&self, point: Coordinate) -> &str {
        self.region_containing(point)
            .map_or(UNKNOWN_REGION_NAME, Region::name)
    }

    /// Exact-name lookup.
    #[must_use]
    pub fn region_named(&self, name: &str) -> Option<&Region> {
        self.by_name
            .get(name)
            .and_then(|&position| self.regions.get(position))
    }

    /// Regions tagged with `borough`, in catalog order.
    pub fn regions_in_group<'a>(&'a self, borough: &'a str) -> impl Iterator<Item = &'a Region> {
        self.regions
            .iter()
            .filter(move |region| region.borough() == Some(borough))
    }

    /// Distinct group tags in order of first appearance.
    #[must_use]
    pub fn boroughs(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.regions
            .iter()
            .filter_map(Region::borough)
            .filter(|borough| seen.insert(*borough))
            .collect()
    }
}
