//! Storage error types.

use swift_auth::AuthError;
use swift_transport::TransportError;
use thiserror::Error;

/// Storage error type.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The request never got an HTTP response
    #[error("Network error: {0}")]
    Network(#[source] TransportError),

    /// Authentication could not be (re-)established
    #[error("Authentication error: {0}")]
    Auth(#[source] AuthError),

    /// Container or object does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Upstream 5xx
    #[error("Server error {status}")]
    Server { status: u16, body: String },

    /// Any other non-2xx status
    #[error("Unexpected status {status}")]
    UnexpectedStatus { status: u16, body: String },

    /// A listing could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Container or object name rejected before sending
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// An object could not be deleted while emptying a container
    #[error("Container {container} not emptied: deleting {object} failed: {source}")]
    ContainerNotEmptied {
        container: String,
        object: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// Upstream status, if the error came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::NotFound { .. } => Some(404),
            StorageError::Server { status, .. } | StorageError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            StorageError::Auth(e) => e.status(),
            StorageError::ContainerNotEmptied { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Network(e) => e.is_transient(),
            StorageError::Server { .. } => true,
            StorageError::Auth(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<TransportError> for StorageError {
    fn from(e: TransportError) -> Self {
        StorageError::Network(e)
    }
}

// A replayed request that failed in transit is still a network failure.
impl From<AuthError> for StorageError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Transport(inner) => StorageError::Network(inner),
            other => StorageError::Auth(other),
        }
    }
}

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;
