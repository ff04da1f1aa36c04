//! The `HttpTransport` seam and its reqwest implementation.

use crate::{summarize_body, Headers, HttpRequest, HttpResponse, Method, TransportError, TransportResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

/// Performs one HTTP exchange.
///
/// Implementations never interpret the status code; a 401 or 500 is a
/// successful exchange from the transport's point of view.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> TransportResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }

    /// Wrap an existing client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    fn to_reqwest_method(method: Method) -> TransportResult<reqwest::Method> {
        reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|_| TransportError::InvalidMethod(method.to_string()))
    }

    fn to_header_map(headers: &Headers) -> TransportResult<HeaderMap> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    fn from_header_map(map: &HeaderMap) -> Headers {
        let mut headers = Headers::new();
        for (name, value) in map {
            match value.to_str() {
                Ok(v) => {
                    headers.insert(name.as_str(), v);
                }
                Err(_) => warn!(header = %name, "Dropping non-ASCII response header"),
            }
        }
        headers
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let method = Self::to_reqwest_method(request.method)?;
        let headers = Self::to_header_map(&request.headers)?;

        debug!(method = %request.method, path = %request.url.path(), "Sending request");

        let mut builder = self
            .http_client
            .request(method, request.url.clone())
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = Self::from_header_map(response.headers());
        let body = response.bytes().await?.to_vec();

        debug!(
            status,
            body_summary = %summarize_body(&body),
            "Received response"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_is_a_valid_reqwest_method() {
        let method = ReqwestTransport::to_reqwest_method(Method::Copy).unwrap();
        assert_eq!(method.as_str(), "COPY");
    }

    #[test]
    fn test_header_map_roundtrip() {
        let headers: Headers = [("X-Auth-Token", "abc"), ("Destination", "y/bar")]
            .into_iter()
            .collect();
        let map = ReqwestTransport::to_header_map(&headers).unwrap();
        assert_eq!(map.get("x-auth-token").unwrap(), "abc");

        let back = ReqwestTransport::from_header_map(&map);
        assert_eq!(back, headers);
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let headers: Headers = [("X-Object-Meta-Bad", "line\nbreak")].into_iter().collect();
        let err = ReqwestTransport::to_header_map(&headers).unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeader(name) if name == "x-object-meta-bad"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        let url = url::Url::parse("http://127.0.0.1:9/v1/AUTH_test").unwrap();
        let result = transport.send(HttpRequest::new(Method::Get, url)).await;
        assert!(matches!(result, Err(TransportError::Http(_))));
    }
}
