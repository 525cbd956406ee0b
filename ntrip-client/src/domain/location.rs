//! Geographic positions and great-circle geometry.

use std::fmt;

/// Mean Earth radius used for all distance computations, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_010.0;

/// A latitude/longitude pair in decimal degrees.
///
/// No range validation is applied: out-of-range values are carried
/// through the geometry as given.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Create a location from decimal degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in metres.
    pub fn distance_to(&self, other: &Location) -> f64 {
        haversine_distance(self, other)
    }

    /// True if both the latitude and longitude deltas to `other` are
    /// within `epsilon_deg` (inclusive).
    pub fn is_within_deg(&self, other: &Location, epsilon_deg: f64) -> bool {
        (self.latitude - other.latitude).abs() <= epsilon_deg
            && longitude_delta(self.longitude, other.longitude) <= epsilon_deg
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Distance in metres between two points using the haversine formula.
///
/// See <https://www.movable-type.co.uk/scripts/latlong.html>.
pub fn haversine_distance(a: &Location, b: &Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let lon2 = b.longitude.to_radians();

    let sin_diff_lat = ((lat2 - lat1) / 2.0).sin();
    let sin_diff_lon = ((lon2 - lon1) / 2.0).sin();

    let h = sin_diff_lat * sin_diff_lat + lat1.cos() * lat2.cos() * sin_diff_lon * sin_diff_lon;
    // Rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Absolute difference between two longitudes, taking the short way
/// round the globe. Always in `[0, 180]`.
pub fn longitude_delta(a: f64, b: f64) -> f64 {
    let delta = (a - b).rem_euclid(360.0);
    if delta > 180.0 { 360.0 - delta } else { delta }
}

/// Angle in degrees subtended by an arc of `length_m` on a circle of `radius_m`.
pub fn meters_to_degrees(length_m: f64, radius_m: f64) -> f64 {
    length_m / radius_m.to_radians()
}

/// Latitude delta in degrees covering `length_m` along a meridian.
///
/// Independent of the latitude it is measured at.
pub fn meters_to_latitude_degrees(length_m: f64) -> f64 {
    meters_to_degrees(length_m, EARTH_RADIUS_M)
}

/// Longitude delta in degrees covering `length_m` along the parallel at
/// `latitude`.
///
/// Grows without bound toward the poles, where every longitude is
/// within reach.
pub fn meters_to_longitude_degrees_at(length_m: f64, latitude: f64) -> f64 {
    meters_to_degrees(length_m, EARTH_RADIUS_M * latitude.to_radians().cos())
}
