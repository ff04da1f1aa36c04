//! Storage request configuration, kept independent of any session so it can
//! be parked and resolved later against whichever session is current.

use crate::AUTH_TOKEN_HEADER;
use swift_transport::{Headers, HttpRequest, Method};
use url::Url;

/// What a storage request addresses, relative to the storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Account,
    Container(String),
    Object { container: String, object: String },
}

impl Target {
    pub fn object(container: impl Into<String>, object: impl Into<String>) -> Self {
        Target::Object {
            container: container.into(),
            object: object.into(),
        }
    }

    /// `container` or `container/object`, as used in logs and errors.
    pub fn display_path(&self) -> String {
        match self {
            Target::Account => String::new(),
            Target::Container(container) => container.clone(),
            Target::Object { container, object } => format!("{container}/{object}"),
        }
    }
}

/// A storage call as the caller built it: method, target, query, the
/// caller's own headers, and body. Bearer headers are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRequest {
    pub method: Method,
    pub target: Target,
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl StorageRequest {
    pub fn new(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            query: Vec::new(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: &Headers) -> Self {
        self.headers.merge(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Build the concrete HTTP request.
    ///
    /// Path segments are appended to `endpoint` one by one, so each is
    /// percent-encoded; an object name containing `/` becomes several
    /// segments. Caller headers win over bearer headers, except the auth
    /// token, which always comes from `bearer` and is stripped if `bearer`
    /// has none.
    pub fn resolve(&self, endpoint: &Url, bearer: &Headers) -> HttpRequest {
        let mut url = endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            match &self.target {
                Target::Account => {}
                Target::Container(container) => {
                    segments.push(container);
                }
                Target::Object { container, object } => {
                    segments.push(container);
                    segments.extend(object.split('/'));
                }
            }
        }

        url.set_query(None);
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }

        let mut headers = bearer.clone();
        headers.merge(&self.headers);
        match bearer.get(AUTH_TOKEN_HEADER) {
            Some(token) => {
                headers.insert(AUTH_TOKEN_HEADER, token);
            }
            None => {
                headers.remove(AUTH_TOKEN_HEADER);
            }
        }

        HttpRequest {
            method: self.method,
            url,
            headers,
            body: self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("http://swift/v1/AUTH_abc").unwrap()
    }

    fn bearer() -> Headers {
        [("X-Auth-Token", "fresh")].into_iter().collect()
    }

    #[test]
    fn test_account_target_keeps_endpoint_path() {
        let request = StorageRequest::new(Method::Get, Target::Account).with_query("format", "json");
        let resolved = request.resolve(&endpoint(), &bearer());
        assert_eq!(resolved.path_and_query(), "/v1/AUTH_abc?format=json");
    }

    #[test]
    fn test_nested_object_name_becomes_segments() {
        let request = StorageRequest::new(Method::Delete, Target::object("cont", "nested/bar"));
        let resolved = request.resolve(&endpoint(), &bearer());
        assert_eq!(resolved.url.path(), "/v1/AUTH_abc/cont/nested/bar");
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let request = StorageRequest::new(Method::Get, Target::object("my cont", "a b/c?d#e"));
        let resolved = request.resolve(&endpoint(), &bearer());
        assert_eq!(resolved.url.path(), "/v1/AUTH_abc/my%20cont/a%20b/c%3Fd%23e");
        assert!(resolved.url.query().is_none());
    }

    #[test]
    fn test_trailing_slash_endpoint() {
        let endpoint = Url::parse("http://swift/").unwrap();
        let request = StorageRequest::new(Method::Head, Target::object("cont", "foo"));
        let resolved = request.resolve(&endpoint, &bearer());
        assert_eq!(resolved.url.as_str(), "http://swift/cont/foo");
    }

    #[test]
    fn test_empty_prefix_is_sent() {
        let request = StorageRequest::new(Method::Get, Target::Container("cont".to_string()))
            .with_query("format", "json")
            .with_query("prefix", "");
        let resolved = request.resolve(&endpoint(), &bearer());
        assert_eq!(resolved.path_and_query(), "/v1/AUTH_abc/cont?format=json&prefix=");
    }

    #[test]
    fn test_stale_token_is_replaced_by_bearer() {
        let request = StorageRequest::new(Method::Get, Target::Account)
            .with_header("x-auth-token", "stale")
            .with_header("X-Foo", "bar");
        let resolved = request.resolve(&endpoint(), &bearer());
        assert_eq!(resolved.headers.get("X-Auth-Token"), Some("fresh"));
        assert_eq!(resolved.headers.get("X-Foo"), Some("bar"));
    }

    #[test]
    fn test_stale_token_is_stripped_without_bearer() {
        let request =
            StorageRequest::new(Method::Get, Target::Account).with_header("X-Auth-Token", "stale");
        let resolved = request.resolve(&endpoint(), &Headers::new());
        assert!(!resolved.headers.contains("X-Auth-Token"));
    }

    #[test]
    fn test_caller_headers_win_over_other_bearer_headers() {
        let bearer: Headers = [("X-Auth-Token", "fresh"), ("X-Project", "from-session")]
            .into_iter()
            .collect();
        let request =
            StorageRequest::new(Method::Post, Target::Account).with_header("X-Project", "mine");
        let resolved = request.resolve(&endpoint(), &bearer);
        assert_eq!(resolved.headers.get("X-Project"), Some("mine"));
    }

    #[test]
    fn test_display_path() {
        assert_eq!(Target::object("c", "a/b").display_path(), "c/a/b");
        assert_eq!(Target::Container("c".to_string()).display_path(), "c");
        assert_eq!(Target::Account.display_path(), "");
    }
}
