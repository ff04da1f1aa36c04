//! Errors raised while locating, reading and applying local settings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// `~/.swift-browser` cannot be placed without a home directory.
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Cannot create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file exists but could not be read or written.
    #[error("Cannot access config file {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {path}")]
    MalformedConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot encode config")]
    EncodeConfig(#[from] serde_json::Error),

    #[error("Unknown auth protocol {0:?}, expected token or keystone")]
    UnknownProtocol(String),

    #[error("Invalid auth URL {url:?}")]
    InvalidAuthUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
