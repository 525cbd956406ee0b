//! The streaming session: one background task per `Selector::stream`.
//!
//! The session owns the consumer's output channel and multiplexes three
//! event sources: termination, source swaps published by the selector,
//! and chunks from the active source. The output channel survives every
//! swap and reconnect; only termination closes it.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::source::CorrectionSource;

use super::config::SelectorConfig;

/// Latest-wins slot carrying the next source to stream from.
pub(crate) type SwapSlot<S> = watch::Sender<Option<Arc<S>>>;

/// The source a session is currently reading from.
enum ActiveSource<S> {
    NoActiveSource,
    Active {
        source: Arc<S>,
        /// `None` while the source is not open.
        chunks: Option<mpsc::Receiver<Bytes>>,
    },
}

impl<S: CorrectionSource> ActiveSource<S> {
    /// Next chunk from the open source; pends forever when nothing is open.
    async fn next_chunk(&mut self) -> Option<Bytes> {
        match self {
            ActiveSource::Active {
                chunks: Some(chunks),
                ..
            } => chunks.recv().await,
            _ => std::future::pending().await,
        }
    }

    fn source(&self) -> Option<&Arc<S>> {
        match self {
            ActiveSource::Active { source, .. } => Some(source),
            ActiveSource::NoActiveSource => None,
        }
    }
}

/// Control side of a running session, held by the selector.
pub(crate) struct SessionHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub(crate) fn new(stop: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }

    /// Signal termination; the returned handle resolves once the session
    /// has released its source and closed the output.
    pub(crate) fn terminate(self) -> JoinHandle<()> {
        let _ = self.stop.send(());
        self.task
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(crate) struct Session<S: CorrectionSource> {
    swaps: watch::Receiver<Option<Arc<S>>>,
    stop: oneshot::Receiver<()>,
    output: mpsc::Sender<Bytes>,
    failures: Arc<AtomicU32>,
    config: SelectorConfig,
    active: ActiveSource<S>,
    retry_at: Option<Instant>,
}

impl<S: CorrectionSource> Session<S> {
    pub(crate) fn new(
        swaps: watch::Receiver<Option<Arc<S>>>,
        stop: oneshot::Receiver<()>,
        output: mpsc::Sender<Bytes>,
        failures: Arc<AtomicU32>,
        config: SelectorConfig,
    ) -> Self {
        Self {
            swaps,
            stop,
            output,
            failures,
            config,
            active: ActiveSource::NoActiveSource,
            retry_at: None,
        }
    }

    /// Run until terminated, the selector is dropped, or the consumer goes
    /// away.
    pub(crate) async fn run(mut self) {
        tracing::debug!("Session started");

        let initial = self.swaps.borrow_and_update().clone();
        let mut flow = match initial {
            Some(source) => self.swap(Some(source)).await,
            None => ControlFlow::Continue(()),
        };

        while flow.is_continue() {
            flow = tokio::select! {
                biased;
                _ = &mut self.stop => ControlFlow::Break(()),
                changed = self.swaps.changed() => match changed {
                    Ok(()) => {
                        let next = self.swaps.borrow_and_update().clone();
                        self.swap(next).await
                    }
                    // Selector dropped
                    Err(_) => ControlFlow::Break(()),
                },
                chunk = self.active.next_chunk() => match chunk {
                    Some(chunk) => self.forward(chunk).await,
                    None => {
                        self.upstream_ended();
                        ControlFlow::Continue(())
                    }
                },
                _ = tokio::time::sleep_until(self.retry_at.unwrap_or_else(Instant::now)),
                    if self.retry_at.is_some() => self.reconnect().await,
            };
        }

        self.release().await;
        tracing::debug!("Session ended");
    }

    /// Replace the active source with `next` and open it.
    async fn swap(&mut self, next: Option<Arc<S>>) -> ControlFlow<()> {
        let previous = std::mem::replace(&mut self.active, ActiveSource::NoActiveSource);

        if let ActiveSource::Active { source, chunks } = previous {
            if let Err(e) = source.close().await {
                tracing::warn!(mountpoint = %source.id(), error = %e, "Error closing mountpoint");
            }
            // Hand over what the old source already delivered
            if let Some(mut chunks) = chunks {
                while let Ok(chunk) = chunks.try_recv() {
                    if self.forward(chunk).await.is_break() {
                        return ControlFlow::Break(());
                    }
                }
            }
        }

        self.failures.store(0, Ordering::Relaxed);
        self.retry_at = None;

        let Some(source) = next else {
            return ControlFlow::Continue(());
        };

        tracing::info!(mountpoint = %source.id(), "Switching to mountpoint");
        self.active = ActiveSource::Active {
            source,
            chunks: None,
        };
        self.open().await
    }

    /// Open the active source, racing against termination and newer swaps.
    ///
    /// A swap published while the open is in flight abandons it; the run
    /// loop then sees the swap as still pending.
    async fn open(&mut self) -> ControlFlow<()> {
        let Some(source) = self.active.source().cloned() else {
            return ControlFlow::Continue(());
        };

        // A clone so that waiting here leaves the swap unseen by `self.swaps`
        let mut pending = self.swaps.clone();

        let opened = tokio::select! {
            biased;
            _ = &mut self.stop => return ControlFlow::Break(()),
            changed = pending.changed() => {
                if changed.is_err() {
                    return ControlFlow::Break(());
                }
                tracing::debug!(mountpoint = %source.id(), "Open superseded by swap");
                return ControlFlow::Continue(());
            }
            opened = source.stream() => opened,
        };

        match opened {
            Ok(rx) => {
                tracing::debug!(mountpoint = %source.id(), "Streaming mountpoint");
                if let ActiveSource::Active { chunks, .. } = &mut self.active {
                    *chunks = Some(rx);
                }
            }
            Err(e) => {
                tracing::warn!(mountpoint = %source.id(), error = %e, "Error in streaming mountpoint");
                self.schedule_retry();
            }
        }

        ControlFlow::Continue(())
    }

    /// Deliver a chunk to the consumer.
    async fn forward(&mut self, chunk: Bytes) -> ControlFlow<()> {
        self.failures.store(0, Ordering::Relaxed);
        tracing::trace!(len = chunk.len(), "Forwarding chunk");

        tokio::select! {
            biased;
            _ = &mut self.stop => ControlFlow::Break(()),
            sent = self.output.send(chunk) => match sent {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => {
                    tracing::debug!("Consumer dropped the stream");
                    ControlFlow::Break(())
                }
            },
        }
    }

    /// The active source stopped without a swap.
    fn upstream_ended(&mut self) {
        if let ActiveSource::Active { source, chunks } = &mut self.active {
            tracing::warn!(mountpoint = %source.id(), "Mountpoint stream stopped");
            *chunks = None;
        }
        self.schedule_retry();
    }

    /// Count a failure and arm the reconnect timer unless the limit is hit.
    fn schedule_retry(&mut self) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;

        if self
            .config
            .max_reconnect_attempts
            .is_some_and(|max| failures > max)
        {
            tracing::warn!(failures, "Giving up on mountpoint until next swap");
            self.retry_at = None;
            return;
        }

        tracing::debug!(
            failures,
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        self.retry_at = Some(Instant::now() + self.config.reconnect_delay);
    }

    /// Reopen the same source in place.
    async fn reconnect(&mut self) -> ControlFlow<()> {
        self.retry_at = None;
        if let Some(source) = self.active.source() {
            tracing::info!(
                mountpoint = %source.id(),
                failures = self.failures.load(Ordering::Relaxed),
                "Reconnecting to mountpoint"
            );
        }
        self.open().await
    }

    /// Close the active source before the session exits.
    async fn release(&mut self) {
        let active = std::mem::replace(&mut self.active, ActiveSource::NoActiveSource);
        if let ActiveSource::Active { source, .. } = active {
            if let Err(e) = source.close().await {
                tracing::warn!(mountpoint = %source.id(), error = %e, "Error closing mountpoint");
            }
        }
    }
}
