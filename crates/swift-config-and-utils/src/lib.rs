//! Configuration, paths, and logging shared by the Swift browser crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{AuthProtocol, Config, LogFormat, DEFAULT_AUTH_URL, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
