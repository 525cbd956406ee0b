//! In-memory station registry with proximity search.
//!
//! Stations are registered once (first write wins) and queried by
//! distance from a reference location. Queries prune candidates with a
//! latitude/longitude bounding box before computing exact haversine
//! distances, and never return a station outside the service radius.

mod config;
mod store;

pub use config::{DEFAULT_SERVICE_RADIUS_M, RegistryConfig};
pub use store::StationRegistry;
