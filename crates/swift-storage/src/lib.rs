//! Swift storage client.
//!
//! This crate provides:
//! - `StorageClient` with one operation per storage primitive (list, get,
//!   head, post, put, delete, copy, container create/delete)
//! - Listing and metadata records (`ContainerInfo`, `ObjectEntry`,
//!   `ObjectMetadata`, ...)
//! - `StorageError`, the error taxonomy callers see
//!
//! Authentication is delegated to `swift_auth::AuthCoordinator`: requests
//! without a session, or rejected with 401, are parked and replayed after
//! the next login.

mod client;
mod error;
mod types;

pub use client::{StorageClient, DESTINATION_HEADER, LISTING_PAGE_LIMIT};
pub use error::{StorageError, StorageResult};
pub use types::{
    ContainerInfo, ListObjectsParams, ObjectContent, ObjectEntry, ObjectInfo, ObjectMetadata,
};
