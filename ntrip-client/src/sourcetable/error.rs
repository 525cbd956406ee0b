//! Sourcetable error types.

use crate::http::HttpSetupError;

/// Errors that can occur when fetching a caster sourcetable.
#[derive(Debug, thiserror::Error)]
pub enum SourcetableError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Caster rejected the credentials
    #[error("unauthorized: check NTRIP_USERNAME and NTRIP_PASSWORD")]
    Unauthorized,

    /// Caster answered with a non-success status
    #[error("caster returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Caster base URL could not be parsed
    #[error("invalid caster URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// HTTP client could not be built
    #[error(transparent)]
    Setup(#[from] HttpSetupError),
}
