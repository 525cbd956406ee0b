//! Station registry implementation.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::{
    Location, StationDistance, StationRecord, longitude_delta, meters_to_latitude_degrees,
    meters_to_longitude_degrees_at,
};

use super::config::RegistryConfig;

/// Slack allowed on the exact distance check so that a station sitting on
/// the service radius is not lost to floating-point rounding.
const RADIUS_TOLERANCE_M: f64 = 1e-3;

/// Registered stations in insertion order, with an id index.
#[derive(Debug, Default)]
struct Stations {
    records: Vec<StationRecord>,
    by_id: HashMap<String, usize>,
}

/// Thread-safe registry of correction stations.
///
/// Read-heavy: proximity queries take a shared lock, registration takes
/// an exclusive one, so a query never observes a half-inserted record.
#[derive(Debug)]
pub struct StationRegistry {
    stations: RwLock<Stations>,
    config: RegistryConfig,
    /// Latitude delta covering the service radius; the same everywhere.
    max_latitude_delta: f64,
}

impl StationRegistry {
    /// Create an empty registry with the default 100 km service radius.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with a custom configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            stations: RwLock::new(Stations::default()),
            max_latitude_delta: meters_to_latitude_degrees(config.service_radius_m),
            config,
        }
    }

    /// Get the registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a station at the given coordinates.
    ///
    /// Returns `true` if the station was added. Registering an id that is
    /// already present is a no-op and returns `false`: the first
    /// registration wins.
    pub async fn register_station(&self, id: impl Into<String>, latitude: f64, longitude: f64) -> bool {
        self.register(StationRecord::new(id, Location::new(latitude, longitude)))
            .await
    }

    /// Register a station record. See [`StationRegistry::register_station`].
    pub async fn register(&self, record: StationRecord) -> bool {
        let mut stations = self.stations.write().await;

        if stations.by_id.contains_key(&record.id) {
            tracing::trace!(station = %record.id, "Station already registered");
            return false;
        }

        tracing::debug!(
            station = %record.id,
            location = %record.location,
            "Station registered"
        );

        let idx = stations.records.len();
        stations.by_id.insert(record.id.clone(), idx);
        stations.records.push(record);
        true
    }

    /// Look up a registered station by id.
    pub async fn get(&self, id: &str) -> Option<StationRecord> {
        let stations = self.stations.read().await;
        stations
            .by_id
            .get(id)
            .map(|&idx| stations.records[idx].clone())
    }

    /// Number of registered stations.
    pub async fn len(&self) -> usize {
        self.stations.read().await.records.len()
    }

    /// Check whether no station is registered.
    pub async fn is_empty(&self) -> bool {
        self.stations.read().await.records.is_empty()
    }

    /// Stations within the service radius of `(latitude, longitude)`,
    /// nearest first.
    ///
    /// Equal distances keep registration order. Returns an empty list if
    /// nothing lies within the radius.
    pub async fn nearest_stations(&self, latitude: f64, longitude: f64) -> Vec<StationDistance> {
        let query = Location::new(latitude, longitude);
        let radius = self.config.service_radius_m;
        let max_longitude_delta = meters_to_longitude_degrees_at(radius, latitude);

        let stations = self.stations.read().await;

        let mut distances: Vec<StationDistance> = stations
            .records
            .iter()
            // Bounding box: necessary, not sufficient
            .filter(|s| {
                (s.location.latitude - latitude).abs() <= self.max_latitude_delta
                    && longitude_delta(s.location.longitude, longitude) <= max_longitude_delta
            })
            .map(|s| StationDistance {
                id: s.id.clone(),
                distance_m: query.distance_to(&s.location),
            })
            .filter(|d| d.distance_m <= radius + RADIUS_TOLERANCE_M)
            .collect();

        drop(stations);

        distances.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

        tracing::trace!(
            location = %query,
            candidates = distances.len(),
            "Nearest stations query"
        );

        distances
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn station_near(center: (f64, f64)) -> impl Strategy<Value = (f64, f64)> {
        (-1.5f64..1.5, -2.0f64..2.0).prop_map(move |(dlat, dlng)| (center.0 + dlat, center.1 + dlng))
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    proptest! {
        /// Results are ascending and all within the radius
        #[test]
        fn nearest_is_sorted_and_bounded(
            stations in prop::collection::vec(station_near((45.0, 5.0)), 0..40),
            query in station_near((45.0, 5.0)),
        ) {
            let nearest = block_on(async {
                let registry = StationRegistry::new();
                for (i, (lat, lng)) in stations.iter().enumerate() {
                    registry.register_station(format!("S{i}"), *lat, *lng).await;
                }
                registry.nearest_stations(query.0, query.1).await
            });

            let q = Location::new(query.0, query.1);
            let clearly_inside = stations
                .iter()
                .filter(|(lat, lng)| q.distance_to(&Location::new(*lat, *lng)) <= 99_900.0)
                .count();

            for window in nearest.windows(2) {
                prop_assert!(window[0].distance_m <= window[1].distance_m);
            }
            for d in &nearest {
                prop_assert!(d.distance_m <= 100_000.0 + 1e-3);
            }
            // The bounding box never prunes a station well inside the radius
            prop_assert!(nearest.len() >= clearly_inside);
        }

        /// Re-registering never moves a station
        #[test]
        fn registration_is_idempotent(
            first in station_near((0.0, 0.0)),
            second in station_near((0.0, 0.0)),
        ) {
            let stored = block_on(async {
                let registry = StationRegistry::new();
                registry.register_station("X", first.0, first.1).await;
                registry.register_station("X", second.0, second.1).await;
                registry.get("X").await
            });

            prop_assert_eq!(stored.map(|s| s.location), Some(Location::new(first.0, first.1)));
        }
    }
}
