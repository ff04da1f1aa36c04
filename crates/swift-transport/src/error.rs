//! Transport error types.

use thiserror::Error;

/// Failure to complete an HTTP exchange at all.
///
/// A response with a non-2xx status is not a transport error; callers
/// classify statuses themselves.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP client error (connect, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Header name or value rejected by the HTTP stack
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Method name rejected by the HTTP stack
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Connection could not be established (used by in-memory transports)
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    /// Returns true if the exchange may succeed when retried.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_connect() || e.is_timeout(),
            TransportError::Connection(_) => true,
            TransportError::InvalidHeader(_) | TransportError::InvalidMethod(_) => false,
        }
    }
}

/// Result type alias using TransportError.
pub type TransportResult<T> = Result<T, TransportError>;
