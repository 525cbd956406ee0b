//! NTRIP correction client.
//!
//! Keeps a GNSS rover connected to the nearest reference-station
//! mountpoint: caster sourcetables are imported into a station registry,
//! and a selector swaps the upstream correction stream as the rover moves
//! without interrupting the consumer.

pub mod domain;
pub mod http;
pub mod output;
pub mod registry;
pub mod selector;
pub mod source;
pub mod sourcetable;

#[cfg(test)]
mod testing;
