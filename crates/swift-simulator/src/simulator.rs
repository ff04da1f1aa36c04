//! Request routing for the simulated Swift proxy.
//!
//! Routes:
//! - `GET  /auth/v1.0`      token-header login
//! - `POST /v2.0/tokens`    Keystone v2 password login
//! - `*    /v1/<account>/…` storage API, guarded by `X-Auth-Token`

use crate::account::{Account, Refusal, DEFAULT_LISTING_LIMIT};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use swift_transport::{
    Headers, HttpRequest, HttpResponse, HttpTransport, Method, TransportError, TransportResult,
};
use tracing::debug;
use url::Url;

pub const TOKEN_AUTH_PATH: &str = "/auth/v1.0";
pub const KEYSTONE_AUTH_PATH: &str = "/v2.0/tokens";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_ACCOUNT: &str = "AUTH_test";

/// What an injected fault does to the matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Answer with this status and no side effect.
    Status(u16),
    /// Fail at the transport level, as if the connection dropped.
    Disconnect,
}

#[derive(Debug, Clone)]
struct Fault {
    method: Method,
    path: String,
    kind: FaultKind,
    remaining: usize,
}

#[derive(Debug, Clone)]
struct TokenUser {
    user: String,
    key: String,
}

#[derive(Debug, Clone)]
struct KeystoneUser {
    tenant: String,
    username: String,
    password: String,
}

#[derive(Debug, Default)]
struct SimulatorState {
    account: Account,
    token_users: Vec<TokenUser>,
    keystone_users: Vec<KeystoneUser>,
    tokens: HashSet<String>,
    issued: u64,
    faults: Vec<Fault>,
    log: Vec<String>,
    listing_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct KeystoneRequest {
    auth: KeystoneAuth,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeystoneAuth {
    #[serde(default)]
    tenant_name: String,
    password_credentials: KeystonePassword,
}

#[derive(Debug, Deserialize)]
struct KeystonePassword {
    username: String,
    password: String,
}

/// In-memory Swift proxy with one account.
///
/// Comes with the token user `test:tester` / `testing` and the Keystone user
/// `tester` / `testing` in tenant `test`.
pub struct SwiftSimulator {
    base_url: Url,
    account_name: String,
    state: Mutex<SimulatorState>,
}

impl Default for SwiftSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SwiftSimulator {
    pub fn new() -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid");
        Self::with_base_url(base_url)
    }

    /// Simulator whose storage URLs live under `base_url`.
    pub fn with_base_url(base_url: Url) -> Self {
        let state = SimulatorState {
            token_users: vec![TokenUser {
                user: "test:tester".to_string(),
                key: "testing".to_string(),
            }],
            keystone_users: vec![KeystoneUser {
                tenant: "test".to_string(),
                username: "tester".to_string(),
                password: "testing".to_string(),
            }],
            ..SimulatorState::default()
        };
        Self {
            base_url,
            account_name: DEFAULT_ACCOUNT.to_string(),
            state: Mutex::new(state),
        }
    }

    /// Simulator pre-loaded with a few containers and objects.
    pub fn with_demo_data() -> Self {
        let simulator = Self::new();
        simulator.create_container("documents");
        simulator.create_container("photos");
        simulator.create_container("empty");
        simulator.put_object(
            "documents",
            "readme.txt",
            "Welcome to the Swift browser.\n",
            "text/plain",
        );
        simulator.put_object(
            "documents",
            "reports/2024/q1.csv",
            "quarter,revenue\nq1,100\n",
            "text/csv",
        );
        simulator.put_object(
            "documents",
            "reports/2024/q2.csv",
            "quarter,revenue\nq2,120\n",
            "text/csv",
        );
        simulator.put_object(
            "documents",
            "reports/summary.md",
            "# Summary\n",
            "text/markdown",
        );
        simulator.put_object("photos", "cat.jpg", vec![0xff, 0xd8, 0xff, 0xe0], "image/jpeg");
        simulator
    }

    /// Register another token-header user.
    pub fn add_token_user(&self, user: &str, key: &str) {
        self.state.lock().token_users.push(TokenUser {
            user: user.to_string(),
            key: key.to_string(),
        });
    }

    /// Register another Keystone user.
    pub fn add_keystone_user(&self, tenant: &str, username: &str, password: &str) {
        self.state.lock().keystone_users.push(KeystoneUser {
            tenant: tenant.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    pub fn auth_url(&self) -> Url {
        self.url_for(TOKEN_AUTH_PATH)
    }

    pub fn keystone_url(&self) -> Url {
        self.url_for(KEYSTONE_AUTH_PATH)
    }

    /// Account URL handed out by both login endpoints.
    pub fn storage_url(&self) -> Url {
        self.url_for(&format!("/v1/{}", self.account_name))
    }

    fn url_for(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }

    pub fn create_container(&self, name: &str) {
        self.state.lock().account.create_container(name);
    }

    /// Store an object directly, creating its container if needed.
    pub fn put_object(
        &self,
        container: &str,
        name: &str,
        content: impl Into<Vec<u8>>,
        content_type: &str,
    ) {
        let mut state = self.state.lock();
        state.account.create_container(container);
        let headers: Headers = [("content-type", content_type)].into_iter().collect();
        let _ = state
            .account
            .put_object(container, name, content.into(), &headers);
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.state.lock().account.container(name).is_ok()
    }

    /// Object names in a container, full depth.
    pub fn object_names(&self, container: &str) -> Vec<String> {
        self.state
            .lock()
            .account
            .container(container)
            .map(|c| c.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Content of a stored object.
    pub fn object_content(&self, container: &str, name: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .account
            .object(container, name)
            .ok()
            .map(|o| o.content.clone())
    }

    /// Invalidate every issued token, as if they had all expired.
    pub fn revoke_tokens(&self) {
        self.state.lock().tokens.clear();
    }

    /// Number of tokens issued so far.
    pub fn tokens_issued(&self) -> u64 {
        self.state.lock().issued
    }

    /// Cap object listings at `limit` entries per page.
    pub fn set_listing_limit(&self, limit: usize) {
        self.state.lock().listing_limit = Some(limit);
    }

    /// Make the next `times` requests matching `method` and `path` fail.
    ///
    /// `path` is compared with the decoded request path, e.g.
    /// `/v1/AUTH_test/cont/nested/bar`.
    pub fn fail_next(&self, method: Method, path: &str, kind: FaultKind, times: usize) {
        self.state.lock().faults.push(Fault {
            method,
            path: path.to_string(),
            kind,
            remaining: times,
        });
    }

    /// Every request received, as `"METHOD /raw/path?query"`.
    pub fn request_log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// Received requests that targeted the storage API.
    pub fn storage_log(&self) -> Vec<String> {
        self.request_log()
            .into_iter()
            .filter(|line| line.contains(" /v1/"))
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    fn handle(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        let path = match urlencoding::decode(request.url.path()) {
            Ok(path) => path.into_owned(),
            Err(_) => return Ok(plain(400, "Invalid UTF8 in path")),
        };

        let mut state = self.state.lock();
        state.log.push(format!("{} {}", request.method, request.path_and_query()));

        if let Some(kind) = take_fault(&mut state.faults, request.method, &path) {
            debug!(method = %request.method, path = %path, ?kind, "Injected fault");
            return match kind {
                FaultKind::Status(status) => Ok(plain(status, "Injected failure")),
                FaultKind::Disconnect => Err(TransportError::Connection(
                    "simulated connection reset".to_string(),
                )),
            };
        }

        match (request.method, path.as_str()) {
            (Method::Get, TOKEN_AUTH_PATH) => Ok(self.token_login(&mut state, request)),
            (Method::Post, KEYSTONE_AUTH_PATH) => Ok(self.keystone_login(&mut state, request)),
            _ => Ok(self.storage(&mut state, request, &path)),
        }
    }

    fn issue_token(state: &mut SimulatorState) -> String {
        state.issued += 1;
        let digest = Sha256::digest(format!("token-{}", state.issued).as_bytes());
        let token = format!("AUTH_tk{}", &hex::encode(digest)[..32]);
        state.tokens.insert(token.clone());
        token
    }

    fn token_login(&self, state: &mut SimulatorState, request: &HttpRequest) -> HttpResponse {
        let user = request.headers.get("x-auth-user").unwrap_or_default();
        let key = request.headers.get("x-auth-key").unwrap_or_default();
        let known = state
            .token_users
            .iter()
            .any(|u| u.user == user && u.key == key);
        if !known {
            debug!(user, "Token login rejected");
            return plain(401, "Unauthorized");
        }

        let token = Self::issue_token(state);
        let storage_url = self.storage_url().to_string();
        HttpResponse::new(200)
            .with_header("x-auth-token", token.clone())
            .with_header("x-storage-token", token)
            .with_header("x-storage-url", storage_url)
            .with_header("x-auth-token-expires", "86400")
    }

    fn keystone_login(&self, state: &mut SimulatorState, request: &HttpRequest) -> HttpResponse {
        let parsed: KeystoneRequest = match request
            .body
            .as_deref()
            .map(serde_json::from_slice::<KeystoneRequest>)
            .transpose()
        {
            Ok(Some(parsed)) => parsed,
            _ => return plain(400, "Malformed JSON"),
        };

        let auth = parsed.auth;
        let known = state.keystone_users.iter().any(|u| {
            u.tenant == auth.tenant_name
                && u.username == auth.password_credentials.username
                && u.password == auth.password_credentials.password
        });
        if !known {
            debug!(user = %auth.password_credentials.username, "Keystone login rejected");
            return HttpResponse::new(401).with_json(&json!({
                "error": {"code": 401, "title": "Unauthorized", "message": "Invalid user / password"}
            }));
        }

        let token = Self::issue_token(state);
        let storage_url = self.storage_url().to_string();
        HttpResponse::new(200).with_json(&json!({
            "access": {
                "token": {
                    "id": token,
                    "tenant": {"id": auth.tenant_name, "name": auth.tenant_name}
                },
                "serviceCatalog": [
                    {
                        "name": "swift",
                        "type": "object-store",
                        "endpoints": [{
                            "publicURL": storage_url,
                            "internalURL": storage_url,
                            "region": "RegionOne"
                        }]
                    }
                ],
                "user": {"name": auth.password_credentials.username}
            }
        }))
    }

    fn storage(&self, state: &mut SimulatorState, request: &HttpRequest, path: &str) -> HttpResponse {
        let Some(rest) = path.strip_prefix("/v1/") else {
            return plain(404, "Not Found");
        };
        let (account, rest) = match rest.split_once('/') {
            Some((account, rest)) => (account, rest),
            None => (rest, ""),
        };

        let authorized = request
            .headers
            .get("x-auth-token")
            .is_some_and(|token| state.tokens.contains(token));
        if !authorized {
            return plain(401, "Unauthorized");
        }
        if account != self.account_name {
            return plain(403, "Forbidden");
        }

        let (container, object) = match rest.split_once('/') {
            Some((container, object)) => (container, object),
            None => (rest, ""),
        };
        let query = Query::new(&request.url);

        let result = match (container.is_empty(), object.is_empty()) {
            (true, _) => account_op(state, request.method),
            (false, true) => container_op(state, request.method, container, &query),
            (false, false) => object_op(state, request, container, object),
        };
        result.unwrap_or_else(|refusal| plain(refusal.status(), status_text(refusal.status())))
    }
}

struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    fn new(url: &Url) -> Self {
        Self {
            pairs: url.query_pairs().into_owned().collect(),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn take_fault(faults: &mut Vec<Fault>, method: Method, path: &str) -> Option<FaultKind> {
    let index = faults
        .iter()
        .position(|f| f.method == method && f.path == path && f.remaining > 0)?;
    let fault = &mut faults[index];
    fault.remaining -= 1;
    let kind = fault.kind;
    if fault.remaining == 0 {
        faults.remove(index);
    }
    Some(kind)
}

fn account_op(state: &mut SimulatorState, method: Method) -> Result<HttpResponse, Refusal> {
    let account = &state.account;
    let headers = [
        ("x-account-container-count", account.containers().len().to_string()),
        ("x-account-object-count", account.object_count().to_string()),
        ("x-account-bytes-used", account.bytes_used().to_string()),
    ];
    match method {
        Method::Get => Ok(with_headers(
            HttpResponse::new(200).with_json(&json!(account.containers())),
            headers,
        )),
        Method::Head => Ok(with_headers(HttpResponse::new(204), headers)),
        _ => Ok(plain(405, "Method Not Allowed")),
    }
}

fn container_op(
    state: &mut SimulatorState,
    method: Method,
    container: &str,
    query: &Query,
) -> Result<HttpResponse, Refusal> {
    match method {
        Method::Get => {
            let prefix = query.get("prefix").unwrap_or_default();
            let limit = state.listing_limit.unwrap_or(DEFAULT_LISTING_LIMIT);
            let entries = state.account.list_objects(
                container,
                prefix,
                query.get("delimiter"),
                query.get("marker"),
                limit,
            )?;
            Ok(HttpResponse::new(200).with_json(&json!(entries)))
        }
        Method::Head => {
            let found = state.account.container(container)?;
            Ok(HttpResponse::new(204)
                .with_header("x-container-object-count", found.objects.len().to_string())
                .with_header("x-container-bytes-used", found.bytes_used().to_string()))
        }
        Method::Put => {
            let status = if state.account.create_container(container) {
                201
            } else {
                202
            };
            Ok(HttpResponse::new(status))
        }
        Method::Delete => {
            state.account.delete_container(container)?;
            Ok(HttpResponse::new(204))
        }
        _ => Ok(plain(405, "Method Not Allowed")),
    }
}

fn object_op(
    state: &mut SimulatorState,
    request: &HttpRequest,
    container: &str,
    object: &str,
) -> Result<HttpResponse, Refusal> {
    match request.method {
        Method::Get => {
            let found = state.account.object(container, object)?;
            Ok(with_headers(
                HttpResponse::new(200).with_body(found.content.clone()),
                found.response_headers().iter(),
            ))
        }
        Method::Head => {
            let found = state.account.object(container, object)?;
            Ok(with_headers(
                HttpResponse::new(200),
                found.response_headers().iter(),
            ))
        }
        Method::Put => {
            let body = request.body.clone().unwrap_or_default();
            let stored = state
                .account
                .put_object(container, object, body, &request.headers)?;
            Ok(HttpResponse::new(201).with_header("etag", stored.etag.clone()))
        }
        Method::Post => {
            state.account.post_object(container, object, &request.headers)?;
            Ok(HttpResponse::new(202))
        }
        Method::Delete => {
            state.account.delete_object(container, object)?;
            Ok(HttpResponse::new(204))
        }
        Method::Copy => {
            let Some(destination) = request.headers.get("destination") else {
                return Ok(plain(412, "Destination header required"));
            };
            let destination = urlencoding::decode(destination)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| destination.to_string());
            let Some((dst_container, dst_object)) =
                destination.trim_start_matches('/').split_once('/')
            else {
                return Ok(plain(412, "Bad Destination header"));
            };
            if dst_object.is_empty() {
                return Ok(plain(412, "Bad Destination header"));
            }
            state
                .account
                .copy_object((container, object), (dst_container, dst_object))?;
            Ok(HttpResponse::new(201))
        }
    }
}

fn with_headers<K, V>(response: HttpResponse, headers: impl IntoIterator<Item = (K, V)>) -> HttpResponse
where
    K: AsRef<str>,
    V: Into<String>,
{
    let mut response = response;
    response.headers.extend(headers);
    response
}

fn plain(status: u16, text: &str) -> HttpResponse {
    HttpResponse::new(status)
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body(text.to_string())
}

fn status_text(status: u16) -> &'static str {
    match status {
        404 => "Not Found",
        409 => "There was a conflict when trying to complete your request.",
        _ => "Error",
    }
}

#[async_trait]
impl HttpTransport for SwiftSimulator {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let response = self.handle(&request)?;
        debug!(
            method = %request.method,
            path = %request.url.path(),
            status = response.status,
            "Simulated request"
        );
        Ok(response)
    }
}
