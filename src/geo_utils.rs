//! # Geographic Utilities
//!
//! Great-circle distance between places.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Distance between two [`GeoPoint`]s on a sphere of a given radius |
//! | [`haversine_meters`] | Same computation on raw latitude/longitude pairs |
//! | [`unit_vector`] | Position on the unit sphere, used for spatial indexing |
//!
//! ## Example
//!
//! ```rust
//! use popularity_imputer::{GeoPoint, geo_utils};
//!
//! let plaza = GeoPoint::new(41.3870, 2.1700);
//! let cathedral = GeoPoint::new(41.3840, 2.1762);
//!
//! let dist = geo_utils::haversine_distance(&plaza, &cathedral, geo_utils::EARTH_RADIUS_METERS);
//! println!("Distance: {:.0}m", dist);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The haversine formula calculates the great-circle distance between two points on a
//! sphere. Distances come from `geo`'s `HaversineMeasure`. The default radius is
//! 6,371,000 m; callers pass the radius explicitly so it can be tuned through
//! [`ImputeConfig`](crate::ImputeConfig).
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees). Inputs are
//! not validated: NaN in gives NaN out.

use geo::{Distance, HaversineMeasure, Point};

use crate::GeoPoint;

/// Mean Earth radius used for distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points in meters.
///
/// The result is symmetric in its arguments and exactly `0.0` for identical points.
///
/// # Example
///
/// ```rust
/// use popularity_imputer::{GeoPoint, geo_utils};
///
/// let a = GeoPoint::new(0.0, 0.0);
/// let b = GeoPoint::new(0.0, 1.0);
///
/// let dist = geo_utils::haversine_distance(&a, &b, geo_utils::EARTH_RADIUS_METERS);
/// assert!((dist - 111_195.0).abs() < 1.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint, radius_meters: f64) -> f64 {
    haversine_meters(p1.latitude, p1.longitude, p2.latitude, p2.longitude, radius_meters)
}

/// Haversine distance on raw coordinates (degrees), in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius_meters: f64) -> f64 {
    let point1 = Point::new(lon1, lat1);
    let point2 = Point::new(lon2, lat2);
    HaversineMeasure::new(radius_meters).distance(point1, point2)
}

/// Position of a point on the unit sphere as `[x, y, z]`.
///
/// Straight-line (chord) distance between two unit vectors grows monotonically
/// with great-circle distance, so nearest-neighbor order in this space matches
/// haversine order.
#[inline]
pub fn unit_vector(p: &GeoPoint) -> [f64; 3] {
    let phi = p.latitude.to_radians();
    let lambda = p.longitude.to_radians();
    [phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin()]
}

// =============================================================================
// Unit Tests
// =============================================================================
