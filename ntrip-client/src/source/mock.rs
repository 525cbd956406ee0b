//! In-memory correction sources for testing without a caster.
//!
//! A [`MockSource`] hands out a fresh channel on every `stream` call; the
//! test side feeds it with [`MockSource::push`] and simulates an upstream
//! drop with [`MockSource::disconnect`]. [`MockSourceFactory`] remembers
//! every source it created so tests can reach them after the selector
//! has built them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use super::error::SourceError;
use super::provider::{CorrectionSource, SourceFactory};

const MOCK_BUFFER_DEPTH: usize = 4;

#[derive(Debug, Default)]
struct MockState {
    feed: Option<mpsc::Sender<Bytes>>,
    failing: bool,
    close_calls: usize,
}

#[derive(Debug)]
struct MockInner {
    id: String,
    state: Mutex<MockState>,
    /// Count of `stream` calls, successful or not.
    stream_calls: watch::Sender<usize>,
}

/// A scripted correction source.
#[derive(Debug, Clone)]
pub struct MockSource {
    inner: Arc<MockInner>,
}

impl MockSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MockInner {
                id: id.into(),
                state: Mutex::new(MockState::default()),
                stream_calls: watch::Sender::new(0),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent `stream` calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    /// Deliver a chunk on the open connection.
    ///
    /// Returns `false` if no connection is open or its receiver is gone.
    pub async fn push(&self, chunk: impl Into<Bytes>) -> bool {
        let feed = self.state().feed.clone();
        match feed {
            Some(feed) => feed.send(chunk.into()).await.is_ok(),
            None => false,
        }
    }

    /// End the open connection as if the upstream dropped it.
    pub fn disconnect(&self) {
        self.state().feed = None;
    }

    /// Check whether a connection is open.
    pub fn is_open(&self) -> bool {
        self.state().feed.as_ref().is_some_and(|f| !f.is_closed())
    }

    /// Number of `stream` calls so far, including failed ones.
    pub fn stream_calls(&self) -> usize {
        *self.inner.stream_calls.borrow()
    }

    /// Number of `close` calls so far.
    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    /// Wait until `stream` has been called at least `n` times.
    pub async fn wait_for_stream_calls(&self, n: usize) {
        let mut calls = self.inner.stream_calls.subscribe();
        // The sender lives in `self`, so this cannot fail
        let _ = calls.wait_for(|&c| c >= n).await;
    }
}

impl CorrectionSource for MockSource {
    fn id(&self) -> &str {
        &self.inner.id
    }

    async fn stream(&self) -> Result<mpsc::Receiver<Bytes>, SourceError> {
        let result = {
            let mut state = self.state();
            if state.failing {
                Err(SourceError::Unavailable(self.inner.id.clone()))
            } else {
                let (tx, rx) = mpsc::channel(MOCK_BUFFER_DEPTH);
                // Replacing the sender ends the previous connection
                state.feed = Some(tx);
                Ok(rx)
            }
        };
        self.inner.stream_calls.send_modify(|c| *c += 1);
        result
    }

    async fn close(&self) -> Result<(), SourceError> {
        let mut state = self.state();
        state.feed = None;
        state.close_calls += 1;
        Ok(())
    }
}

/// Factory that creates [`MockSource`]s and keeps a handle to each.
#[derive(Debug, Clone, Default)]
pub struct MockSourceFactory {
    created: Arc<Mutex<Vec<MockSource>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources created for `mountpoint` from now on refuse to open.
    pub fn fail(&self, mountpoint: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(mountpoint.to_string());
    }

    /// Most recently created source for `mountpoint`.
    pub fn source(&self, mountpoint: &str) -> Option<MockSource> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|s| s.id() == mountpoint)
            .cloned()
    }

    /// Ids of all sources created so far, in creation order.
    pub fn created(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| s.id().to_string())
            .collect()
    }
}

impl SourceFactory for MockSourceFactory {
    type Source = MockSource;

    fn create(&self, mountpoint: &str) -> MockSource {
        let source = MockSource::new(mountpoint);
        if self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(mountpoint)
        {
            source.set_failing(true);
        }
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(source.clone());
        source
    }
}
