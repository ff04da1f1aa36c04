//! Configuration management for the Swift browser.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default auth endpoint (a local Swift proxy with tempauth/liteauth).
pub const DEFAULT_AUTH_URL: &str = "http://127.0.0.1:8080/auth/v1.0";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default timeout applied to every HTTP request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which login protocol the prompt should offer first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProtocol {
    /// `X-Auth-User` / `X-Auth-Key` header exchange.
    #[default]
    Token,
    /// Keystone v2 JSON token exchange.
    Keystone,
}

impl FromStr for AuthProtocol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" | "liteauth" | "tempauth" => Ok(Self::Token),
            "keystone" => Ok(Self::Keystone),
            other => Err(CoreError::UnknownProtocol(other.to_string())),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log line format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Auth endpoint pre-filled in the login prompt.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Login protocol pre-selected in the login prompt.
    #[serde(default)]
    pub auth_protocol: AuthProtocol,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            auth_url: default_auth_url(),
            auth_protocol: AuthProtocol::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CoreError::MalformedConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        let path = paths.config_file();
        std::fs::write(&path, content).map_err(|source| CoreError::ConfigFile { path, source })
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) -> CoreResult<()> {
        if let Ok(log_level) = std::env::var("SWIFT_BROWSER_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(auth_url) = std::env::var("SWIFT_BROWSER_AUTH_URL") {
            self.auth_url = auth_url;
        }
        if let Ok(protocol) = std::env::var("SWIFT_BROWSER_AUTH_PROTOCOL") {
            self.auth_protocol = protocol.parse()?;
        }
        Ok(())
    }

    /// Get the auth URL as a parsed URL.
    pub fn auth_url(&self) -> CoreResult<Url> {
        Url::parse(&self.auth_url).map_err(|source| CoreError::InvalidAuthUrl {
            url: self.auth_url.clone(),
            source,
        })
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
