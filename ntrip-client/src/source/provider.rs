//! Abstractions over correction-data sources.
//!
//! The selector only needs to open, reopen and release a source, and to
//! build a new one for a mountpoint id. These traits let it run against
//! live NTRIP mountpoints or in-memory mocks.

use std::future::Future;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::error::SourceError;

/// One upstream data connection for one mountpoint.
///
/// Implementations keep at most one connection open: calling `stream`
/// again replaces the previous connection, whose sequence then ends.
pub trait CorrectionSource: Send + Sync + 'static {
    /// Mountpoint identifier this source is bound to.
    fn id(&self) -> &str;

    /// Open a connection and return its chunk sequence.
    ///
    /// The sequence ends on read failure, on `close`, or when the upstream
    /// stops. These cases are indistinguishable to the receiver.
    fn stream(&self) -> impl Future<Output = Result<mpsc::Receiver<Bytes>, SourceError>> + Send;

    /// Stop the open connection, if any. Idempotent.
    fn close(&self) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// Builds a source bound to a mountpoint.
pub trait SourceFactory: Send + Sync + 'static {
    type Source: CorrectionSource;

    /// Create an unopened source for `mountpoint`.
    fn create(&self, mountpoint: &str) -> Self::Source;
}
