use std::sync::Arc;

use ntrip_client::output::WriterOutput;
use ntrip_client::registry::StationRegistry;
use ntrip_client::selector::{Selector, SelectorConfig};
use ntrip_client::source::{ClientConfig, MountpointClientFactory};
use ntrip_client::sourcetable::{CasterClient, CasterConfig, DEFAULT_CASTER_URL, SourceImporter};
use tracing_subscriber::EnvFilter;

/// Default rover position (Lusignan, France).
const DEFAULT_LATITUDE: f64 = 46.3531178;
const DEFAULT_LONGITUDE: f64 = 0.54;

/// Settings read from the environment.
struct Settings {
    caster_url: String,
    username: Option<String>,
    password: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl Settings {
    fn from_env() -> Self {
        Self {
            caster_url: std::env::var("NTRIP_CASTER_URL")
                .unwrap_or_else(|_| DEFAULT_CASTER_URL.to_string()),
            username: std::env::var("NTRIP_USERNAME").ok(),
            password: std::env::var("NTRIP_PASSWORD").ok(),
            latitude: coordinate("NTRIP_LATITUDE", DEFAULT_LATITUDE),
            longitude: coordinate("NTRIP_LONGITUDE", DEFAULT_LONGITUDE),
        }
    }
}

fn coordinate(var: &str, default: f64) -> f64 {
    match std::env::var(var) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(var, value, "Not a number, using default");
            default
        }),
        Err(_) => default,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Stdout carries the correction stream
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env();
    tracing::info!(caster = %settings.caster_url, "Starting NTRIP client");

    let mut caster_config = CasterConfig::new(&settings.caster_url);
    let mut client_config = ClientConfig::default();
    if let Some(username) = &settings.username {
        let password = settings.password.clone().unwrap_or_default();
        caster_config = caster_config.with_credentials(username, &password);
        client_config = client_config.with_credentials(username, password);
    }

    let registry = Arc::new(StationRegistry::new());
    let importer = SourceImporter::new(CasterClient::new(caster_config)?);
    let count = importer.register_mountpoints(&registry).await?;
    tracing::info!(count, "Loaded mountpoints");

    let factory = MountpointClientFactory::new(client_config)?;
    let selector = Selector::new(registry, factory, SelectorConfig::default());
    selector
        .set_location(settings.latitude, settings.longitude)
        .await?;

    let output = WriterOutput::new(tokio::io::stdout());
    output.stream(selector.stream().await).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Got interrupt, shutting down");

    selector.close().await;
    output.close().await?;

    Ok(())
}
