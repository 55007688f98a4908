#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar geometry kernel.
//!
//! Pure functions over [`Coordinate`] and [`Polygon`]: even-odd
//! containment, shoelace area converted to square meters with a
//! flat-earth local approximation, and Euclidean distance in raw degree
//! space. These are only meaningful for city-sized shapes; nothing here
//! corrects for the curvature of the earth.

use fog_map_geography_models::{Coordinate, Polygon};

/// Approximate meters spanned by one degree of latitude.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 111_000.0;

/// Below this longitude scale (meters per degree) a distance in meters has
/// no usable degree equivalent.
pub const MIN_METERS_PER_DEGREE_LONGITUDE: f64 = 1.0;

/// Tests whether `point` is inside `polygon` using the even-odd rule.
///
/// A horizontal ray is cast from `point`; each edge whose endpoints sit on
/// opposite sides of `point.longitude` and whose interpolated crossing
/// latitude is above `point.latitude` toggles the result. Points exactly on
/// an edge or vertex get a deterministic but unspecified answer.
#[must_use]
pub fn contains(point: Coordinate, polygon: &Polygon) -> bool {
    if !polygon.is_closed_ring() {
        return false;
    }

    let mut inside = false;

    for (pi, pj) in polygon.edges() {
        let straddles = (pi.longitude > point.longitude) != (pj.longitude > point.longitude);
        if !straddles {
            continue;
        }

        // `straddles` guarantees the longitudes differ, so the slope is finite.
        let crossing_latitude = (pj.latitude - pi.latitude) * (point.longitude - pi.longitude)
            / (pj.longitude - pi.longitude)
            + pi.latitude;

        if point.latitude < crossing_latitude {
            inside = !inside;
        }
    }

    inside
}

/// Shoelace area in square degrees, always non-negative.
///
/// Vertices are taken relative to the first one so the cross products stay
/// small and do not cancel far from the origin.
#[must_use]
pub fn area_square_degrees(polygon: &Polygon) -> f64 {
    if !polygon.is_closed_ring() {
        return 0.0;
    }

    let origin = polygon.vertices()[0];
    let twice_area: f64 = polygon
        .edges()
        .map(|(a, b)| {
            let (ax, ay) = (a.longitude - origin.longitude, a.latitude - origin.latitude);
            let (bx, by) = (b.longitude - origin.longitude, b.latitude - origin.latitude);
            ax.mul_add(by, -(bx * ay))
        })
        .sum();

    twice_area.abs() / 2.0
}

/// Approximate polygon area in square meters.
///
/// Square degrees are scaled by [`METERS_PER_DEGREE_LATITUDE`] and by the
/// longitude scale at the mean vertex latitude. Degenerate input yields
/// `0.0`, never NaN.
#[must_use]
pub fn area(polygon: &Polygon) -> f64 {
    let Some(avg_latitude) = average_latitude(polygon) else {
        return 0.0;
    };

    let square_meters = area_square_degrees(polygon)
        * METERS_PER_DEGREE_LATITUDE
        * meters_per_degree_longitude(avg_latitude);

    if square_meters.is_finite() {
        square_meters.max(0.0)
    } else {
        0.0
    }
}

/// Euclidean distance in degree space: `sqrt(dlat^2 + dlon^2)`.
///
/// Only suitable for relative comparisons, since a degree of longitude
/// shrinks with latitude.
#[must_use]
pub fn planar_distance(a: Coordinate, b: Coordinate) -> f64 {
    (a.latitude - b.latitude).hypot(a.longitude - b.longitude)
}

/// Meters spanned by one degree of longitude at `latitude`.
#[must_use]
pub fn meters_per_degree_longitude(latitude: f64) -> f64 {
    METERS_PER_DEGREE_LATITUDE * latitude.to_radians().cos()
}

/// Converts a distance in meters to degrees using the longitude scale at
/// `latitude`.
///
/// Returns `None` when a degree of longitude spans less than
/// [`MIN_METERS_PER_DEGREE_LONGITUDE`] (at or near the poles) or the input
/// is not finite.
#[must_use]
pub fn meters_to_longitude_degrees(meters: f64, latitude: f64) -> Option<f64> {
    let scale = meters_per_degree_longitude(latitude);
    if !scale.is_finite() || scale < MIN_METERS_PER_DEGREE_LONGITUDE {
        return None;
    }

    let degrees = meters / scale;
    degrees.is_finite().then_some(degrees)
}

/// Arithmetic mean of the vertex latitudes, or `None` for an empty polygon.
#[must_use]
pub fn average_latitude(polygon: &Polygon) -> Option<f64> {
    if polygon.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = polygon.len() as f64;
    let sum: f64 = polygon.vertices().iter().map(|c| c.latitude).sum();
    Some(sum / count)
}

/// Converts a boundary into a [`geo::Polygon`] with `x = longitude` and
/// `y = latitude`.
#[must_use]
pub fn to_geo_polygon(polygon: &Polygon) -> geo::Polygon<f64> {
    let exterior: Vec<geo::Coord<f64>> = polygon
        .vertices()
        .iter()
        .map(|c| geo::coord! { x: c.longitude, y: c.latitude })
        .collect();

    geo::Polygon::new(geo::LineString::new(exterior), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn square() -> Polygon {
        vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.01),
            Coordinate::new(0.01, 0.01),
            Coordinate::new(0.01, 0.0),
        ]
        .into()
    }

    fn park_slope_like() -> Polygon {
        vec![
            Coordinate::new(40.665_352, -73.992_937),
            Coordinate::new(40.657_449, -73.983_088),
            Coordinate::new(40.672_331, -73.970_417),
            Coordinate::new(40.684_838, -73.978_051),
            Coordinate::new(40.676_042, -73.983_985),
        ]
        .into()
    }

    #[test]
    fn centroid_of_convex_polygon_is_inside() {
        assert!(contains(Coordinate::new(0.005, 0.005), &square()));
    }

    #[test]
    fn far_away_point_is_outside() {
        assert!(!contains(Coordinate::new(5.0, 5.0), &square()));
        assert!(!contains(Coordinate::new(-1.0, 0.005), &square()));
        assert!(!contains(Coordinate::new(0.005, 1.0), &square()));
    }

    #[test]
    fn concave_notch_is_outside() {
        // U shape opening to the north.
        let u: Polygon = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 3.0),
            Coordinate::new(3.0, 3.0),
            Coordinate::new(3.0, 2.0),
            Coordinate::new(1.0, 2.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(3.0, 1.0),
            Coordinate::new(3.0, 0.0),
        ]
        .into();

        assert!(contains(Coordinate::new(0.5, 1.5), &u));
        assert!(contains(Coordinate::new(2.0, 0.5), &u));
        assert!(!contains(Coordinate::new(2.0, 1.5), &u));
    }

    #[test]
    fn degenerate_polygons_contain_nothing() {
        let line: Polygon = vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)].into();
        assert!(!contains(Coordinate::new(0.5, 0.5), &line));
        assert!(!contains(Coordinate::new(0.0, 0.0), &Polygon::default()));
    }

    #[test]
    fn repeated_closing_vertex_does_not_change_containment() {
        let mut vertices = square().vertices().to_vec();
        vertices.push(vertices[0]);
        let closed: Polygon = vertices.into();
        assert!(contains(Coordinate::new(0.005, 0.005), &closed));
        assert!(!contains(Coordinate::new(0.02, 0.005), &closed));
    }

    #[test]
    fn area_is_positive_and_orientation_independent() {
        let forward = park_slope_like();
        let reversed: Polygon = forward.vertices().iter().rev().copied().collect();

        let a = area(&forward);
        let b = area(&reversed);
        assert!(a > 0.0);
        assert!((a - b).abs() <= a * 1e-12, "forward {a}, reversed {b}");
    }

    #[test]
    fn area_does_not_depend_on_where_the_polygon_sits() {
        let near_origin = square();
        let shifted: Polygon = near_origin
            .vertices()
            .iter()
            .map(|c| Coordinate::new(c.latitude, c.longitude - 74.0))
            .collect();

        let a = area_square_degrees(&near_origin);
        let b = area_square_degrees(&shifted);
        assert!((a - b).abs() <= a * 1e-9, "{a} vs {b}");
    }

    #[test]
    fn square_area_matches_flat_earth_formula() {
        // 0.0001 sq deg * 111000 * 111000 * cos(0.005 deg)
        let expected = 0.0001 * 111_000.0 * 111_000.0 * 0.005_f64.to_radians().cos();
        assert!((area(&square()) - expected).abs() < 1e-3);
    }

    #[test]
    fn shoelace_matches_geo_unsigned_area() {
        let polygon = park_slope_like();
        let ours = area_square_degrees(&polygon);
        let theirs = to_geo_polygon(&polygon).unsigned_area();
        assert!((ours - theirs).abs() < 1e-12);
    }

    #[test]
    fn degenerate_area_is_zero() {
        assert!(area(&Polygon::default()).abs() < f64::EPSILON);
        let line: Polygon = vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)].into();
        assert!(area(&line).abs() < f64::EPSILON);
        let collinear: Polygon = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
        ]
        .into();
        assert!(area(&collinear).abs() < 1e-9);
    }

    #[test]
    fn planar_distance_is_euclidean_in_degrees() {
        let d = planar_distance(Coordinate::new(0.0, 0.0), Coordinate::new(3.0, 4.0));
        assert!((d - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn longitude_scale_shrinks_with_latitude() {
        assert!((meters_per_degree_longitude(0.0) - METERS_PER_DEGREE_LATITUDE).abs() < 1e-9);
        assert!(meters_per_degree_longitude(60.0) < 55_600.0);
        assert!(meters_to_longitude_degrees(60.0, 90.0).is_none());
        assert!(meters_to_longitude_degrees(60.0, -90.0).is_none());
        assert!(meters_to_longitude_degrees(60.0, 89.999_999_9).is_none());
        assert!(meters_to_longitude_degrees(60.0, 89.9).is_some());
        let at_nyc = meters_to_longitude_degrees(60.0, 40.67).unwrap();
        assert!(at_nyc > 60.0 / METERS_PER_DEGREE_LATITUDE);
    }
}
