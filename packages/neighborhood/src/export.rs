//! `GeoJSON` export of catalog boundaries for map layers.

use fog_map_geography::to_geo_polygon;
use fog_map_neighborhood_models::Region;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};

use crate::RegionCatalog;

impl RegionCatalog {
    /// Exports every region as a `GeoJSON` `Polygon` feature with `name`
    /// and `borough` properties, in catalog order.
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.all_regions().iter().map(region_feature).collect(),
            foreign_members: None,
        }
    }
}

/// Converts a single region into a `GeoJSON` feature.
#[must_use]
pub fn region_feature(region: &Region) -> Feature {
    let geo_polygon = to_geo_polygon(region.boundary());
    let geometry = Geometry::new(geojson::Value::from(&geo_polygon));

    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), region.name().into());
    properties.insert(
        "borough".to_string(),
        region
            .borough()
            .map_or(serde_json::Value::Null, serde_json::Value::from),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
