//! Authentication error types.

use swift_transport::TransportError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The auth endpoint answered with a non-2xx status
    #[error("Login rejected with status {status}")]
    Unauthorized { status: u16, body: String },

    /// The auth endpoint answered 2xx but without a usable token or endpoint
    #[error("Malformed auth response: {0}")]
    MalformedResponse(String),

    /// The HTTP exchange itself failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON error while encoding a login request
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A login protocol is already running
    #[error("A login is already in progress")]
    LoginInProgress,

    /// The login prompt was dismissed while the request waited for a session
    #[error("Authentication abandoned")]
    Abandoned,

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),
}

impl AuthError {
    /// Returns true if this error is transient and the login can be retried
    /// with the same credentials.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Transport(e) => e.is_transient(),
            AuthError::Unauthorized { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Upstream status, if the error came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Unauthorized { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
