//! HTTP plumbing for the Swift browser.
//!
//! This crate provides:
//! - Explicit request/response records for every storage call
//! - A case-insensitive header map
//! - The `HttpTransport` seam with a reqwest-backed implementation

mod error;
mod headers;
mod message;
mod transport;

pub use error::{TransportError, TransportResult};
pub use headers::Headers;
pub use message::{summarize_body, HttpRequest, HttpResponse, Method};
pub use transport::{HttpTransport, ReqwestTransport};
