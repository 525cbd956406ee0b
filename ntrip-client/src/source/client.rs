//! Live NTRIP mountpoint client.
//!
//! Opens one long-lived HTTP request against a mountpoint URL and relays
//! the response body as newline-delimited chunks through a small bounded
//! channel. A slow consumer stalls the read loop once the channel fills.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::http::{Credentials, build_client};

use super::error::SourceError;
use super::lines::LineSplitter;
use super::provider::{CorrectionSource, SourceFactory};

/// Default depth of the chunk channel.
const DEFAULT_BUFFER_DEPTH: usize = 4;

/// Default cap on a single chunk when no newline arrives.
const DEFAULT_MAX_CHUNK_BYTES: usize = 4096;

/// Configuration for mountpoint connections.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Caster credentials, if the mountpoint requires them
    pub credentials: Option<Credentials>,
    /// Bound on establishing the TCP connection
    pub connect_timeout: Duration,
    /// Fail `stream` when the caster sends no response headers for this
    /// long, and end the stream when no data arrives for this long
    pub read_timeout: Option<Duration>,
    /// Depth of the chunk channel between read loop and consumer
    pub buffer_depth: usize,
    /// Largest chunk forwarded when no newline is seen
    pub max_chunk_bytes: usize,
}

impl ClientConfig {
    /// Create a config with default timeouts and no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate with the given credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle read timeout (`None` waits forever).
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the chunk channel depth.
    pub fn with_buffer_depth(mut self, depth: usize) -> Self {
        self.buffer_depth = depth;
        self
    }

    /// Set the largest chunk forwarded without a newline.
    pub fn with_max_chunk_bytes(mut self, bytes: usize) -> Self {
        self.max_chunk_bytes = bytes;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(30)),
            buffer_depth: DEFAULT_BUFFER_DEPTH,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        }
    }
}

/// A running read loop.
struct Connection {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Connection {
    /// Signal the read loop and wait for it to release the response.
    async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Mountpoint read loop panicked");
        }
    }
}

/// Client for a single NTRIP mountpoint.
///
/// Holds at most one open connection. `stream` and `close` on the same
/// client are serialized.
pub struct MountpointClient {
    url: String,
    http: reqwest::Client,
    config: ClientConfig,
    connection: Mutex<Option<Connection>>,
}

impl MountpointClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(url: impl Into<String>, config: ClientConfig) -> Result<Self, SourceError> {
        let http = build_client(config.credentials.as_ref(), config.connect_timeout)?;
        Ok(Self::with_http(url, http, config))
    }

    /// Create a client sharing an existing HTTP client.
    ///
    /// The HTTP client must already carry the NTRIP headers (see
    /// [`crate::http::build_client`]).
    pub fn with_http(url: impl Into<String>, http: reqwest::Client, config: ClientConfig) -> Self {
        Self {
            url: url.into(),
            http,
            config,
            connection: Mutex::new(None),
        }
    }

    /// The mountpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check whether a read loop is currently running.
    pub async fn is_streaming(&self) -> bool {
        self.connection
            .lock()
            .await
            .as_ref()
            .is_some_and(|c| !c.task.is_finished())
    }

    /// Open the mountpoint and start relaying its data.
    ///
    /// On success any previous connection is shut down first. On failure
    /// the previous connection, if any, is left running.
    pub async fn stream(&self) -> Result<mpsc::Receiver<Bytes>, SourceError> {
        let mut connection = self.connection.lock().await;

        tracing::debug!(mountpoint = %self.url, "Connecting to mountpoint");

        let request = self.http.get(&self.url).send();
        let response = match self.config.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| SourceError::Timeout(timeout))??,
            None => request.await?,
        };
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SourceError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        if let Some(previous) = connection.take() {
            previous.shutdown().await;
        }

        let (tx, rx) = mpsc::channel(self.config.buffer_depth.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(read_loop(
            self.url.clone(),
            response,
            tx,
            stop_rx,
            self.config.read_timeout,
            self.config.max_chunk_bytes,
        ));

        *connection = Some(Connection {
            stop: stop_tx,
            task,
        });

        tracing::debug!(mountpoint = %self.url, "Mountpoint connected");

        Ok(rx)
    }

    /// Stop the open connection, if any.
    pub async fn close(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            connection.shutdown().await;
            tracing::debug!(mountpoint = %self.url, "Mountpoint closed");
        }
    }
}

impl std::fmt::Debug for MountpointClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountpointClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl CorrectionSource for MountpointClient {
    fn id(&self) -> &str {
        &self.url
    }

    async fn stream(&self) -> Result<mpsc::Receiver<Bytes>, SourceError> {
        MountpointClient::stream(self).await
    }

    async fn close(&self) -> Result<(), SourceError> {
        MountpointClient::close(self).await;
        Ok(())
    }
}

/// What a single body read produced.
enum Read {
    Data(Bytes),
    End,
    Failed(reqwest::Error),
    Idle,
}

/// Relay the response body until it ends, fails, idles out, or is stopped.
async fn read_loop(
    mountpoint: String,
    response: reqwest::Response,
    tx: mpsc::Sender<Bytes>,
    mut stop: oneshot::Receiver<()>,
    read_timeout: Option<Duration>,
    max_chunk_bytes: usize,
) {
    let mut body = std::pin::pin!(response.bytes_stream());
    let mut lines = LineSplitter::new(max_chunk_bytes);

    loop {
        let next = async {
            let item = match read_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, body.next()).await {
                    Ok(item) => item,
                    Err(_) => return Read::Idle,
                },
                None => body.next().await,
            };
            match item {
                Some(Ok(data)) => Read::Data(data),
                Some(Err(e)) => Read::Failed(e),
                None => Read::End,
            }
        };

        let read = tokio::select! {
            biased;
            _ = &mut stop => {
                tracing::debug!(mountpoint = %mountpoint, "Read loop stopped");
                return;
            }
            read = next => read,
        };

        let ended = matches!(read, Read::End);

        let chunks = match read {
            Read::Data(data) => lines.push(&data),
            Read::End => {
                tracing::debug!(mountpoint = %mountpoint, "Mountpoint stream ended");
                lines.finish().into_iter().collect()
            }
            Read::Failed(e) => {
                tracing::warn!(mountpoint = %mountpoint, error = %e, "Error reading mountpoint");
                return;
            }
            Read::Idle => {
                tracing::warn!(mountpoint = %mountpoint, "Mountpoint read timed out");
                return;
            }
        };

        for chunk in chunks {
            tracing::trace!(mountpoint = %mountpoint, len = chunk.len(), "Chunk received");
            tokio::select! {
                biased;
                _ = &mut stop => return,
                sent = tx.send(chunk) => {
                    if sent.is_err() {
                        tracing::debug!(mountpoint = %mountpoint, "Receiver dropped");
                        return;
                    }
                }
            }
        }

        if ended {
            return;
        }
    }
}

/// Builds [`MountpointClient`]s sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct MountpointClientFactory {
    http: reqwest::Client,
    config: ClientConfig,
}

impl MountpointClientFactory {
    /// Create a factory; the HTTP client is built once from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, SourceError> {
        let http = build_client(config.credentials.as_ref(), config.connect_timeout)?;
        Ok(Self { http, config })
    }
}

impl SourceFactory for MountpointClientFactory {
    type Source = MountpointClient;

    fn create(&self, mountpoint: &str) -> MountpointClient {
        MountpointClient::with_http(mountpoint, self.http.clone(), self.config.clone())
    }
}
