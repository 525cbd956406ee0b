//! Pipes a correction stream into any async writer.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::error::OutputError;

struct Pump {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Pump {
    async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Output pump panicked");
        }
    }
}

/// Writes every received chunk to a writer, flushing after each one.
///
/// Only one input is pumped at a time; a new [`stream`](Self::stream)
/// call detaches the previous input first.
pub struct WriterOutput<W> {
    writer: Arc<Mutex<Option<W>>>,
    pump: Mutex<Option<Pump>>,
}

impl<W> WriterOutput<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Some(writer))),
            pump: Mutex::new(None),
        }
    }

    /// Start pumping `input` into the writer in the background.
    ///
    /// Fails with [`OutputError::Closed`] after [`close`](Self::close).
    pub async fn stream(&self, input: mpsc::Receiver<Bytes>) -> Result<(), OutputError> {
        let mut pump = self.pump.lock().await;

        if let Some(previous) = pump.take() {
            previous.stop().await;
        }

        if self.writer.lock().await.is_none() {
            return Err(OutputError::Closed);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_pump(self.writer.clone(), input, stop_rx));
        *pump = Some(Pump {
            stop: stop_tx,
            task,
        });

        Ok(())
    }

    /// Stop pumping and shut down the writer. Idempotent.
    pub async fn close(&self) -> Result<(), OutputError> {
        if let Some(pump) = self.pump.lock().await.take() {
            pump.stop().await;
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            writer.shutdown().await?;
            tracing::debug!("Output closed");
        }

        Ok(())
    }
}

async fn run_pump<W: AsyncWrite + Unpin>(
    writer: Arc<Mutex<Option<W>>>,
    mut input: mpsc::Receiver<Bytes>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let chunk = tokio::select! {
            biased;
            _ = &mut stop => break,
            chunk = input.recv() => chunk,
        };

        let Some(chunk) = chunk else {
            tracing::debug!("Output input ended");
            break;
        };

        let mut guard = writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            break;
        };

        if let Err(e) = write_chunk(writer, &chunk).await {
            tracing::warn!(error = %e, "Error writing output");
            break;
        }
        tracing::trace!(len = chunk.len(), "Wrote chunk");
    }
}

async fn write_chunk<W: AsyncWrite + Unpin>(writer: &mut W, chunk: &[u8]) -> std::io::Result<()> {
    writer.write_all(chunk).await?;
    writer.flush().await
}
