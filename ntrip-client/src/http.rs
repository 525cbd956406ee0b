//! NTRIP v2 HTTP plumbing shared by the sourcetable and mountpoint clients.
//!
//! NTRIP v2 is plain HTTP/1.1 with two extra conventions: an
//! `Ntrip-Version` header on every request and a `User-Agent` starting
//! with `NTRIP`. Credentials use HTTP Basic authentication.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

/// Protocol version announced in the `Ntrip-Version` header.
pub const NTRIP_VERSION: &str = "Ntrip/2.0";

/// `User-Agent` sent with every request.
pub const USER_AGENT_VALUE: &str = concat!(
    "NTRIP ",
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION")
);

/// Caster credentials for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Error building the HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum HttpSetupError {
    /// Credentials contain bytes not allowed in a header
    #[error("invalid credentials: not representable as a header value")]
    InvalidCredentials,

    /// reqwest refused the client configuration
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Build a reqwest client that sends NTRIP v2 headers on every request.
///
/// Only the connect phase is bounded by `connect_timeout`; a total request
/// timeout would cut off long-lived data streams.
pub fn build_client(
    credentials: Option<&Credentials>,
    connect_timeout: Duration,
) -> Result<reqwest::Client, HttpSetupError> {
    let mut headers = HeaderMap::new();
    headers.insert("ntrip-version", HeaderValue::from_static(NTRIP_VERSION));

    if let Some(credentials) = credentials {
        let mut value = HeaderValue::from_str(&credentials.authorization())
            .map_err(|_| HttpSetupError::InvalidCredentials)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(connect_timeout)
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_authorization() {
        let credentials = Credentials::new("Aladdin", "open sesame");
        assert_eq!(
            credentials.authorization(),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn debug_hides_password() {
        let credentials = Credentials::new("rover", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("rover"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn user_agent_is_ntrip_prefixed() {
        assert!(USER_AGENT_VALUE.starts_with("NTRIP ntrip-client/"));
        assert_eq!(
            HeaderValue::from_static(USER_AGENT_VALUE).to_str().unwrap(),
            USER_AGENT_VALUE
        );
    }

    #[test]
    fn client_creation() {
        let credentials = Credentials::new("user", "pass");
        assert!(build_client(Some(&credentials), Duration::from_secs(5)).is_ok());
        assert!(build_client(None, Duration::from_secs(5)).is_ok());
    }
}
