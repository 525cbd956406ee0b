//! Correction-data sources.
//!
//! A source is one upstream connection to one mountpoint, producing a
//! sequence of opaque byte chunks. [`MountpointClient`] speaks NTRIP v2 to
//! a live caster; [`MockSource`] is an in-memory stand-in for tests.

mod client;
mod error;
mod lines;
mod mock;
mod provider;

pub use client::{ClientConfig, MountpointClient, MountpointClientFactory};
pub use error::SourceError;
pub use lines::LineSplitter;
pub use mock::{MockSource, MockSourceFactory};
pub use provider::{CorrectionSource, SourceFactory};
