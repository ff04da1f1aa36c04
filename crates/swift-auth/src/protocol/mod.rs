//! Login protocols.
//!
//! Both protocols turn credentials into a [`LoginGrant`]: the bearer headers
//! to attach to storage requests and the storage endpoint to send them to.

mod keystone;
mod token_header;

pub use keystone::{KeystoneProtocol, STORAGE_SERVICE_NAME};
pub use token_header::TokenHeaderProtocol;

use crate::{AuthError, AuthResult, LoginGrant};
use async_trait::async_trait;
use swift_transport::{summarize_body, HttpResponse};
use url::Url;

/// Request header carrying the user name for the token-header protocol.
pub const AUTH_USER_HEADER: &str = "X-Auth-User";
/// Request header carrying the key for the token-header protocol.
pub const AUTH_KEY_HEADER: &str = "X-Auth-Key";
/// Header carrying the token, both in login responses and storage requests.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
/// Response header carrying the storage endpoint for the token-header protocol.
pub const STORAGE_URL_HEADER: &str = "X-Storage-Url";

/// A strategy that exchanges credentials for a session.
#[async_trait]
pub trait LoginProtocol: Send + Sync {
    type Credentials: Send + Sync;

    /// Run the exchange. Fails with [`AuthError::Unauthorized`] on a non-2xx
    /// response and [`AuthError::MalformedResponse`] when the response lacks
    /// a token or endpoint.
    async fn login(&self, credentials: &Self::Credentials) -> AuthResult<LoginGrant>;
}

/// Turn a non-2xx login response into an error.
fn reject(response: &HttpResponse, protocol: &str) -> AuthError {
    tracing::warn!(
        protocol,
        status = response.status,
        body_summary = %summarize_body(&response.body),
        "Login rejected"
    );
    AuthError::Unauthorized {
        status: response.status,
        body: response.text(),
    }
}

/// Resolve a storage endpoint that may be relative to the auth URL, and make
/// sure path segments can be appended to it.
fn parse_endpoint(auth_url: &Url, raw: &str) -> AuthResult<Url> {
    let endpoint = auth_url
        .join(raw.trim())
        .map_err(|e| AuthError::MalformedResponse(format!("invalid storage endpoint {raw:?}: {e}")))?;
    if endpoint.cannot_be_a_base() {
        return Err(AuthError::MalformedResponse(format!(
            "storage endpoint {raw:?} cannot hold paths"
        )));
    }
    Ok(endpoint)
}
