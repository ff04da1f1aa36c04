//! Keystone v2 password login.
//!
//! `POST <auth_url>` with a JSON body naming the tenant and password
//! credentials. The token id and the storage endpoint are read from the
//! returned access document and its service catalog.

use super::{parse_endpoint, reject, LoginProtocol, AUTH_TOKEN_HEADER};
use crate::{AuthError, AuthResult, KeystoneCredentials, LoginGrant};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swift_transport::{Headers, HttpRequest, HttpTransport, Method};
use tracing::{debug, info};

/// Catalog entry name of the object-storage service.
pub const STORAGE_SERVICE_NAME: &str = "swift";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    tenant_name: &'a str,
    password_credentials: PasswordCredentials<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: TokenInfo,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(rename = "publicURL")]
    public_url: Option<String>,
}

/// Keystone login strategy.
#[derive(Clone)]
pub struct KeystoneProtocol {
    transport: Arc<dyn HttpTransport>,
}

impl KeystoneProtocol {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl LoginProtocol for KeystoneProtocol {
    type Credentials = KeystoneCredentials;

    async fn login(&self, credentials: &KeystoneCredentials) -> AuthResult<LoginGrant> {
        let body = serde_json::to_vec(&TokenRequest {
            auth: AuthBody {
                tenant_name: &credentials.tenant,
                password_credentials: PasswordCredentials {
                    username: &credentials.username,
                    password: &credentials.password,
                },
            },
        })?;

        let request = HttpRequest::new(Method::Post, credentials.auth_url.clone())
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_body(body);

        debug!(
            auth_url = %credentials.auth_url,
            tenant = %credentials.tenant,
            user = %credentials.username,
            "Keystone login"
        );

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(reject(&response, "keystone"));
        }

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| AuthError::MalformedResponse(format!("unreadable access document: {e}")))?;

        let public_url = parsed
            .access
            .service_catalog
            .iter()
            .find(|entry| entry.name == STORAGE_SERVICE_NAME)
            .ok_or_else(|| {
                AuthError::MalformedResponse(format!(
                    "no {STORAGE_SERVICE_NAME:?} entry in service catalog"
                ))
            })?
            .endpoints
            .first()
            .and_then(|endpoint| endpoint.public_url.as_deref())
            .ok_or_else(|| {
                AuthError::MalformedResponse(format!(
                    "{STORAGE_SERVICE_NAME:?} catalog entry has no public endpoint"
                ))
            })?;

        let storage_endpoint = parse_endpoint(&credentials.auth_url, public_url)?;
        let mut bearer_headers = Headers::new();
        bearer_headers.insert(AUTH_TOKEN_HEADER, parsed.access.token.id);

        info!(storage_endpoint = %storage_endpoint, "Keystone login succeeded");

        Ok(LoginGrant {
            bearer_headers,
            storage_endpoint,
        })
    }
}
