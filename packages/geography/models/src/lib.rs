#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate, polygon, and bounding box types.
//!
//! All values are plain degrees in a WGS84-like planar approximation. No
//! geodesic correction is applied anywhere in the engine beyond a fixed
//! per-latitude longitude scale (see `fog_map_geography`).

use serde::{Deserialize, Serialize};

/// A point on the map in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (positive north).
    pub latitude: f64,
    /// Longitude in degrees (positive east).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<[f64; 2]> for Coordinate {
    /// Converts a `[latitude, longitude]` pair.
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

/// An implicitly closed ring of coordinates.
///
/// The last vertex connects back to the first. Rings are assumed to be
/// simple (non-self-intersecting); this is not checked. A ring that
/// repeats its first vertex at the end is accepted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    vertices: Vec<Coordinate>,
}

impl Polygon {
    /// Creates a polygon from its vertices in ring order.
    #[must_use]
    pub const fn new(vertices: Vec<Coordinate>) -> Self {
        Self { vertices }
    }

    /// Returns the vertices in ring order.
    #[must_use]
    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns `true` if the ring has enough vertices to enclose area.
    #[must_use]
    pub fn is_closed_ring(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// Iterates over every edge `(Pi, Pj)` including the closing edge from
    /// the last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        let count = self.vertices.len();
        (0..count).map(move |i| (self.vertices[i], self.vertices[(i + 1) % count]))
    }

    /// Returns the axis-aligned bounding box, or `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.vertices.first()?;
        let mut bbox = BoundingBox::from_point(*first);
        for vertex in &self.vertices[1..] {
            bbox.extend(*vertex);
        }
        Some(bbox)
    }
}

impl From<Vec<Coordinate>> for Polygon {
    fn from(vertices: Vec<Coordinate>) -> Self {
        Self::new(vertices)
    }
}

impl FromIterator<Coordinate> for Polygon {
    fn from_iter<T: IntoIterator<Item = Coordinate>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// An axis-aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern edge.
    pub min_latitude: f64,
    /// Western edge.
    pub min_longitude: f64,
    /// Northern edge.
    pub max_latitude: f64,
    /// Eastern edge.
    pub max_longitude: f64,
}

impl BoundingBox {
    /// A zero-size box around a single point.
    #[must_use]
    pub const fn from_point(point: Coordinate) -> Self {
        Self {
            min_latitude: point.latitude,
            min_longitude: point.longitude,
            max_latitude: point.latitude,
            max_longitude: point.longitude,
        }
    }

    /// Grows the box to include `point`.
    pub fn extend(&mut self, point: Coordinate) {
        self.min_latitude = self.min_latitude.min(point.latitude);
        self.min_longitude = self.min_longitude.min(point.longitude);
        self.max_latitude = self.max_latitude.max(point.latitude);
        self.max_longitude = self.max_longitude.max(point.longitude);
    }

    /// Latitude extent in degrees.
    #[must_use]
    pub fn latitude_span(&self) -> f64 {
        self.max_latitude - self.min_latitude
    }

    /// Longitude extent in degrees.
    #[must_use]
    pub fn longitude_span(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }

    /// Returns `true` if `point` lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.min_latitude
            && point.latitude <= self.max_latitude
            && point.longitude >= self.min_longitude
            && point.longitude <= self.max_longitude
    }
}
