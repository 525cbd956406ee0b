//! Registers a caster's mountpoints into the station registry.

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::Mutex;

use crate::registry::StationRegistry;

use super::client::CasterClient;
use super::error::SourcetableError;
use super::parse::Sourcetable;

/// Imports mountpoints from one caster.
///
/// The sourcetable is fetched on first use and kept; [`refresh`] fetches
/// it again.
///
/// [`refresh`]: SourceImporter::refresh
pub struct SourceImporter {
    client: CasterClient,
    cached: Mutex<Option<Arc<Sourcetable>>>,
}

impl SourceImporter {
    pub fn new(client: CasterClient) -> Self {
        Self {
            client,
            cached: Mutex::new(None),
        }
    }

    /// The sourcetable, fetching it if not yet known.
    pub async fn sourcetable(&self) -> Result<Arc<Sourcetable>, SourcetableError> {
        let mut cached = self.cached.lock().await;
        if let Some(table) = cached.as_ref() {
            return Ok(table.clone());
        }

        let table = Arc::new(self.client.fetch_sourcetable().await?);
        *cached = Some(table.clone());
        Ok(table)
    }

    /// Fetch the sourcetable again.
    ///
    /// On failure the previously fetched table is kept.
    pub async fn refresh(&self) -> Result<Arc<Sourcetable>, SourcetableError> {
        let table = Arc::new(self.client.fetch_sourcetable().await?);
        *self.cached.lock().await = Some(table.clone());
        Ok(table)
    }

    /// Register every advertised mountpoint under its full URL.
    ///
    /// Returns the number of mountpoints processed. Mountpoints already in
    /// the registry keep their first registration.
    pub async fn register_mountpoints(
        &self,
        registry: &StationRegistry,
    ) -> Result<usize, SourcetableError> {
        let table = self.sourcetable().await?;

        for entry in &table.mountpoints {
            let url = mountpoint_url(self.client.base_url(), &entry.name);
            registry
                .register_station(url.as_str(), entry.location.latitude, entry.location.longitude)
                .await;
        }

        tracing::info!(
            count = table.mountpoints.len(),
            caster = %self.client.base_url(),
            "Registered mountpoints"
        );
        Ok(table.mountpoints.len())
    }
}

/// Caster base URL with its path replaced by the mountpoint name.
pub fn mountpoint_url(base: &Url, mountpoint: &str) -> Url {
    let mut url = base.clone();
    url.set_path(mountpoint);
    url.set_query(None);
    url.set_fragment(None);
    url
}
