//! Sinks for the correction stream.

mod error;
mod writer;

pub use error::OutputError;
pub use writer::WriterOutput;
