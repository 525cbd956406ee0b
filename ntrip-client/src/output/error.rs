//! Output error types.

/// Errors from an output sink.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The sink was closed and accepts no further streams
    #[error("output closed")]
    Closed,

    /// Writing or shutting down the writer failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
