//! Station and caster records.

use super::location::Location;

/// A mountpoint advertised by a caster, as registered in the station
/// registry.
///
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    /// Unique mountpoint identifier (the full mountpoint URL when imported
    /// from a sourcetable).
    pub id: String,
    pub location: Location,
}

impl StationRecord {
    pub fn new(id: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }
}

/// Result of a proximity query: a station and its distance from the query
/// point.
#[derive(Debug, Clone, PartialEq)]
pub struct StationDistance {
    pub id: String,
    pub distance_m: f64,
}

/// A caster advertised in a sourcetable `CAS` entry.
///
/// Parsed for completeness but not used for station selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CasterRecord {
    pub host: String,
    pub port: u16,
    pub identifier: String,
    pub location: Location,
}
