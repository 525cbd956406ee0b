//! Domain types for correction-source selection.
//!
//! Locations are plain decimal degrees. Distances are great-circle
//! metres computed with the haversine formula.

mod location;
mod station;

pub use location::{
    EARTH_RADIUS_M, Location, haversine_distance, longitude_delta, meters_to_degrees,
    meters_to_latitude_degrees, meters_to_longitude_degrees_at,
};
pub use station::{CasterRecord, StationDistance, StationRecord};
