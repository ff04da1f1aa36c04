//! Token-header login (Swift tempauth / liteauth style).
//!
//! `GET <auth_url>` with `X-Auth-User` and `X-Auth-Key`; the token and the
//! storage endpoint come back as response headers.

use super::{
    parse_endpoint, reject, LoginProtocol, AUTH_KEY_HEADER, AUTH_TOKEN_HEADER, AUTH_USER_HEADER,
    STORAGE_URL_HEADER,
};
use crate::{AuthError, AuthResult, LoginGrant, TokenCredentials};
use async_trait::async_trait;
use std::sync::Arc;
use swift_transport::{Headers, HttpRequest, HttpTransport, Method};
use tracing::{debug, info};

/// Token-header login strategy.
#[derive(Clone)]
pub struct TokenHeaderProtocol {
    transport: Arc<dyn HttpTransport>,
}

impl TokenHeaderProtocol {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl LoginProtocol for TokenHeaderProtocol {
    type Credentials = TokenCredentials;

    async fn login(&self, credentials: &TokenCredentials) -> AuthResult<LoginGrant> {
        let request = HttpRequest::new(Method::Get, credentials.auth_url.clone())
            .with_header(AUTH_USER_HEADER, credentials.auth_user.as_str())
            .with_header(AUTH_KEY_HEADER, credentials.auth_key.as_str());

        debug!(auth_url = %credentials.auth_url, user = %credentials.auth_user, "Token-header login");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(reject(&response, "token"));
        }

        let token = response
            .headers
            .get(AUTH_TOKEN_HEADER)
            .ok_or_else(|| AuthError::MalformedResponse(format!("missing {AUTH_TOKEN_HEADER} header")))?;
        let storage_url = response
            .headers
            .get(STORAGE_URL_HEADER)
            .ok_or_else(|| AuthError::MalformedResponse(format!("missing {STORAGE_URL_HEADER} header")))?;

        let storage_endpoint = parse_endpoint(&credentials.auth_url, storage_url)?;
        let mut bearer_headers = Headers::new();
        bearer_headers.insert(AUTH_TOKEN_HEADER, token);

        info!(storage_endpoint = %storage_endpoint, "Token-header login succeeded");

        Ok(LoginGrant {
            bearer_headers,
            storage_endpoint,
        })
    }
}
