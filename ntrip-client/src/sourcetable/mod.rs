//! Caster sourcetable retrieval and mountpoint import.
//!
//! Fetches a caster's sourcetable over NTRIP v2, parses its `STR` and
//! `CAS` records, and registers each mountpoint in a
//! [`StationRegistry`](crate::registry::StationRegistry) under its full
//! URL.

mod client;
mod error;
mod import;
mod parse;

pub use client::{CasterClient, CasterConfig, DEFAULT_CASTER_URL};
pub use error::SourcetableError;
pub use import::{SourceImporter, mountpoint_url};
pub use parse::{MountpointEntry, Sourcetable};
