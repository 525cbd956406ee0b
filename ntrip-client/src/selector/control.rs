//! Nearest-mountpoint selector.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc, oneshot, watch};

use crate::domain::Location;
use crate::registry::StationRegistry;
use crate::source::SourceFactory;

use super::config::SelectorConfig;
use super::error::SelectorError;
use super::session::{Session, SessionHandle, SwapSlot};

/// Bookkeeping guarded by the selector's lock.
#[derive(Default)]
struct SelectorState {
    /// Last accepted reference location; `None` until the first success.
    reference: Option<Location>,
    /// Mountpoint currently handed to the session.
    selected: Option<String>,
    /// Bypass the significant-change guard on the next selection.
    invalidated: bool,
    session: Option<SessionHandle>,
}

/// Keeps a single correction stream pointed at the mountpoint nearest to
/// a moving reference location.
///
/// [`Selector::stream`] returns a channel that stays open across source
/// swaps; [`Selector::set_location`] picks the nearest station and swaps
/// the session's upstream without the consumer seeing a restart.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use ntrip_client::registry::StationRegistry;
/// use ntrip_client::selector::{Selector, SelectorConfig};
/// use ntrip_client::source::{ClientConfig, MountpointClientFactory};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(StationRegistry::new());
/// registry
///     .register_station("http://caster.centipede.fr:2101/CT", 46.35, 0.54)
///     .await;
///
/// let factory = MountpointClientFactory::new(ClientConfig::default())?;
/// let selector = Selector::new(registry, factory, SelectorConfig::default());
///
/// selector.set_location(46.3531178, 0.54).await?;
/// let mut rx = selector.stream().await;
/// while let Some(chunk) = rx.recv().await {
///     println!("{} bytes", chunk.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Selector<F: SourceFactory> {
    registry: Arc<StationRegistry>,
    factory: F,
    config: SelectorConfig,
    state: Mutex<SelectorState>,
    swaps: SwapSlot<F::Source>,
    failures: Arc<AtomicU32>,
}

impl<F: SourceFactory> Selector<F> {
    /// Create an idle selector over `registry`, building sources with
    /// `factory`.
    pub fn new(registry: Arc<StationRegistry>, factory: F, config: SelectorConfig) -> Self {
        Self {
            registry,
            factory,
            config,
            state: Mutex::new(SelectorState::default()),
            swaps: watch::Sender::new(None),
            failures: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Get the selector configuration.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Start a new session and return its output channel.
    ///
    /// A session that is already running is terminated and its channel
    /// closed. Data starts flowing asynchronously once a source is
    /// selected.
    pub async fn stream(&self) -> mpsc::Receiver<Bytes> {
        let mut state = self.state.lock().await;

        let previous = state.session.take().map(SessionHandle::terminate);

        let (tx, rx) = mpsc::channel(self.config.buffer_depth.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let session = Session::new(
            self.swaps.subscribe(),
            stop_rx,
            tx,
            self.failures.clone(),
            self.config.clone(),
        );

        let task = tokio::spawn(async move {
            // The previous session must release the shared source first
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::warn!(error = %e, "Previous session panicked");
                }
            }
            session.run().await;
        });

        state.session = Some(SessionHandle::new(stop_tx, task));
        rx
    }

    /// Update the reference location and switch to the nearest station if
    /// it changed.
    ///
    /// Moves smaller than the significant-change threshold on both axes
    /// are ignored. Fails without touching any state if no station lies
    /// within the service radius.
    pub async fn set_location(&self, latitude: f64, longitude: f64) -> Result<(), SelectorError> {
        let mut state = self.state.lock().await;
        self.select(&mut state, Location::new(latitude, longitude))
            .await
    }

    /// Force the next selection to re-query the registry.
    ///
    /// With a known reference location the selection is redone right away,
    /// which picks up stations registered since. The current mountpoint is
    /// kept if it is still the nearest.
    pub async fn invalidate(&self) -> Result<(), SelectorError> {
        let mut state = self.state.lock().await;
        state.invalidated = true;

        match state.reference {
            Some(reference) => self.select(&mut state, reference).await,
            None => Ok(()),
        }
    }

    /// Terminate the running session, if any, and wait for it to release
    /// its source. Idempotent.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;

        if let Some(session) = state.session.take() {
            if let Err(e) = session.terminate().await {
                tracing::warn!(error = %e, "Session panicked");
            }
            tracing::debug!("Selector closed");
        }
    }

    /// Mountpoint currently selected.
    pub async fn selected_mountpoint(&self) -> Option<String> {
        self.state.lock().await.selected.clone()
    }

    /// Last accepted reference location.
    pub async fn reference_location(&self) -> Option<Location> {
        self.state.lock().await.reference
    }

    /// Check whether a session is running.
    pub async fn is_streaming(&self) -> bool {
        self.state
            .lock()
            .await
            .session
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    /// Consecutive upstream failures since the last swap or delivered chunk.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn select(&self, state: &mut SelectorState, location: Location) -> Result<(), SelectorError> {
        if !state.invalidated
            && state
                .reference
                .is_some_and(|r| r.is_within_deg(&location, self.config.significant_change_deg))
        {
            tracing::trace!(location = %location, "No significant change");
            return Ok(());
        }

        let nearest = self
            .registry
            .nearest_stations(location.latitude, location.longitude)
            .await;

        let Some(best) = nearest.into_iter().next() else {
            tracing::warn!(location = %location, "No station found nearby");
            return Err(SelectorError::NoStationFound {
                latitude: location.latitude,
                longitude: location.longitude,
            });
        };

        state.invalidated = false;
        state.reference = Some(location);

        if state.selected.as_deref() == Some(best.id.as_str()) {
            tracing::debug!(mountpoint = %best.id, "Nearest mountpoint unchanged");
            return Ok(());
        }

        tracing::info!(
            mountpoint = %best.id,
            distance_m = best.distance_m,
            "Selected mountpoint"
        );

        let source = Arc::new(self.factory.create(&best.id));
        state.selected = Some(best.id);
        self.swaps.send_replace(Some(source));

        Ok(())
    }
}
