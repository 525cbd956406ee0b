//! Nearest-mountpoint selection and the streaming session that follows it.
//!
//! A [`Selector`] keeps one output channel alive while its upstream source
//! changes underneath: location updates pick the nearest registered
//! station, and the background session swaps to it, draining whatever the
//! previous source had already delivered.

mod config;
mod control;
mod error;
mod session;


pub use config::{DEFAULT_SIGNIFICANT_CHANGE_DEG, SelectorConfig};
pub use control::Selector;
pub use error::SelectorError;
