//! Login credentials and the result of a successful login.

use std::fmt;
use swift_transport::Headers;
use url::Url;

/// Credentials for the `X-Auth-User` / `X-Auth-Key` header exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCredentials {
    pub auth_url: Url,
    pub auth_user: String,
    pub auth_key: String,
}

/// Credentials for the Keystone v2 password exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct KeystoneCredentials {
    pub auth_url: Url,
    pub tenant: String,
    pub username: String,
    pub password: String,
}

/// Credentials for one of the supported login protocols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(TokenCredentials),
    Keystone(KeystoneCredentials),
}

impl Credentials {
    /// Auth endpoint the credentials are sent to.
    pub fn auth_url(&self) -> &Url {
        match self {
            Credentials::Token(c) => &c.auth_url,
            Credentials::Keystone(c) => &c.auth_url,
        }
    }

    /// Short protocol name for logs.
    pub fn protocol_name(&self) -> &'static str {
        match self {
            Credentials::Token(_) => "token",
            Credentials::Keystone(_) => "keystone",
        }
    }
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("auth_url", &self.auth_url.as_str())
            .field("auth_user", &self.auth_user)
            .field("auth_key", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for KeystoneCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoneCredentials")
            .field("auth_url", &self.auth_url.as_str())
            .field("tenant", &self.tenant)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a login protocol hands back on success.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginGrant {
    /// Headers to attach to every storage request.
    pub bearer_headers: Headers,
    /// Account URL under which containers live.
    pub storage_endpoint: Url,
}

impl fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.bearer_headers.iter().map(|(name, _)| name).collect();
        f.debug_struct("LoginGrant")
            .field("bearer_headers", &names)
            .field("storage_endpoint", &self.storage_endpoint.as_str())
            .finish()
    }
}
