//! CLI command implementations.

mod auth;
mod browse;
mod edit;
mod shell;

pub use auth::{login, status};
pub use browse::{containers, get, head, ls};
pub use edit::{cp, meta, mkdir, put, rm, rmdir};
pub use shell::shell;

use anyhow::{bail, Result};
use serde_json::{Map, Value};
use swift_transport::Headers;

/// Split `container/object` into its parts.
pub fn split_object_path(path: &str) -> Result<(String, String)> {
    let path = path.trim_start_matches('/');
    match path.split_once('/') {
        Some((container, object)) if !container.is_empty() && !object.is_empty() => {
            Ok((container.to_string(), object.to_string()))
        }
        _ => bail!("Expected <container>/<object>, got {path:?}"),
    }
}

/// Headers as a JSON object.
pub fn headers_json(headers: &Headers) -> Value {
    let map: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    Value::Object(map)
}
