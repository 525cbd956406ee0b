//! Upstream connection error types.

use crate::http::HttpSetupError;

/// Errors opening or maintaining a mountpoint data connection.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (connection refused, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Caster rejected the credentials
    #[error("unauthorized: check NTRIP_USERNAME and NTRIP_PASSWORD")]
    Unauthorized,

    /// Caster answered with a non-success status
    #[error("caster returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Caster sent no response headers within the read timeout
    #[error("no response from caster within {0:?}")]
    Timeout(std::time::Duration),

    /// HTTP client could not be built
    #[error(transparent)]
    Setup(#[from] HttpSetupError),

    /// Source refused to open (used by non-network sources)
    #[error("source unavailable: {0}")]
    Unavailable(String),
}
