//! Station registry configuration.

/// Default service radius: 100 km.
pub const DEFAULT_SERVICE_RADIUS_M: f64 = 100_000.0;

/// Configuration for proximity queries.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum distance from the query point at which a station is still
    /// a candidate, in metres.
    pub service_radius_m: f64,
}

impl RegistryConfig {
    /// Create a config with the given service radius.
    pub fn new(service_radius_m: f64) -> Self {
        Self { service_radius_m }
    }

    /// Set the service radius.
    pub fn with_service_radius(mut self, service_radius_m: f64) -> Self {
        self.service_radius_m = service_radius_m;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            service_radius_m: DEFAULT_SERVICE_RADIUS_M,
        }
    }
}
