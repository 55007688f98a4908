//! Compile-time registry of embedded neighborhood boundary files.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a borough requires creating a TOML file in `regions/` and adding
//! a corresponding entry here. Entry order is catalog order.

use fog_map_neighborhood_models::RegionSource;

/// Number of regions across all embedded files. Enforced by a test.
#[cfg(test)]
const EXPECTED_REGION_COUNT: usize = 58;

/// Embedded TOML boundary files.
pub(crate) const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("brooklyn", include_str!("../regions/brooklyn.toml")),
    ("manhattan", include_str!("../regions/manhattan.toml")),
];

/// Returns all embedded boundary files in catalog order.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_sources() -> Vec<RegionSource> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse region source '{name}': {e}"))
        })
        .collect()
}
