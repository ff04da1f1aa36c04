//! The in-memory session.

use crate::{LoginGrant, AUTH_TOKEN_HEADER};
use swift_transport::Headers;
use url::Url;

/// Bearer headers and storage endpoint of the current login.
///
/// Owned by the `AuthCoordinator`; both fields are set together on a
/// successful login and cleared together whenever the session stops being
/// usable.
#[derive(Debug, Default)]
pub struct Session {
    bearer_headers: Headers,
    storage_endpoint: Option<Url>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the result of a successful login, replacing any previous
    /// headers.
    pub(crate) fn establish(&mut self, grant: LoginGrant) {
        self.bearer_headers = grant.bearer_headers;
        self.storage_endpoint = Some(grant.storage_endpoint);
    }

    pub(crate) fn clear(&mut self) {
        self.bearer_headers = Headers::new();
        self.storage_endpoint = None;
    }

    pub fn is_established(&self) -> bool {
        self.storage_endpoint.is_some() && !self.bearer_headers.is_empty()
    }

    pub fn bearer_headers(&self) -> &Headers {
        &self.bearer_headers
    }

    pub fn storage_endpoint(&self) -> Option<&Url> {
        self.storage_endpoint.as_ref()
    }

    /// Copy of the session for sending requests outside the coordinator lock.
    pub(crate) fn snapshot(&self) -> Option<ActiveSession> {
        let storage_endpoint = self.storage_endpoint.clone()?;
        if self.bearer_headers.is_empty() {
            return None;
        }
        Some(ActiveSession {
            bearer_headers: self.bearer_headers.clone(),
            storage_endpoint,
        })
    }
}

/// A usable session, detached from the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub bearer_headers: Headers,
    pub storage_endpoint: Url,
}

impl ActiveSession {
    /// The auth token this session sends.
    pub fn token(&self) -> Option<&str> {
        self.bearer_headers.get(AUTH_TOKEN_HEADER)
    }
}

impl From<LoginGrant> for ActiveSession {
    fn from(grant: LoginGrant) -> Self {
        Self {
            bearer_headers: grant.bearer_headers,
            storage_endpoint: grant.storage_endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(token: &str) -> LoginGrant {
        LoginGrant {
            bearer_headers: [("X-Auth-Token", token)].into_iter().collect(),
            storage_endpoint: Url::parse("http://swift/v1/AUTH_test").unwrap(),
        }
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(!session.is_established());
        assert!(session.bearer_headers().is_empty());
        assert!(session.storage_endpoint().is_none());
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn test_establish_and_clear() {
        let mut session = Session::new();
        session.establish(grant("t1"));
        assert!(session.is_established());
        assert_eq!(session.snapshot().unwrap().token(), Some("t1"));

        session.clear();
        assert!(!session.is_established());
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn test_establish_replaces_previous_token() {
        let mut session = Session::new();
        session.establish(grant("old"));
        session.establish(grant("new"));
        assert_eq!(session.bearer_headers().len(), 1);
        assert_eq!(session.bearer_headers().get("x-auth-token"), Some("new"));
    }
}
