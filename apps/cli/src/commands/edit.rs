//! Commands that change the account: upload, metadata, delete, copy and
//! container creation.

use super::browse::print_metadata;
use super::split_object_path;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::Path;
use swift_storage::{ObjectMetadata, StorageClient};
use swift_transport::Headers;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Resolve an upload or copy target. A target ending in `/` keeps `name`.
fn resolve_target(target: &str, name: &str) -> Result<(String, String)> {
    let target = target.trim_start_matches('/');
    match target.split_once('/') {
        None => Ok((target.to_string(), name.to_string())),
        Some((container, "")) => Ok((container.to_string(), name.to_string())),
        Some((container, dir)) if dir.ends_with('/') => {
            Ok((container.to_string(), format!("{dir}{name}")))
        }
        Some(_) => split_object_path(target),
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Upload a local file.
pub async fn put(
    client: &StorageClient,
    local: &Path,
    target: &str,
    content_type: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .context("Local path has no file name")?;
    let (container, object) = resolve_target(target, name)?;
    let body = std::fs::read(local)
        .with_context(|| format!("Could not read {}", local.display()))?;
    let size = body.len() as u64;

    let mut headers = Headers::new();
    headers.insert("Content-Type", content_type.unwrap_or(DEFAULT_CONTENT_TYPE));
    let etag = client.upload_object(&container, &object, body, &headers).await?;

    match format {
        OutputFormat::Json => output::print_json(&json!({
            "container": container,
            "object": object,
            "bytes": size,
            "etag": etag,
        }))?,
        OutputFormat::Text => output::print_success(
            &format!(
                "Uploaded {}/{} ({})",
                container,
                object,
                output::format_bytes(size)
            ),
            format,
        ),
    }
    Ok(())
}

/// Header name for a metadata key given on the command line. Keys that are
/// not editable headers become `x-object-meta-*`.
pub fn metadata_header_name(key: &str) -> String {
    let key = key.trim().to_ascii_lowercase();
    if ObjectMetadata::is_editable(&key) {
        key
    } else {
        format!("x-object-meta-{key}")
    }
}

/// Parse `key=value`.
pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((metadata_header_name(key), value.to_string()))
        }
        _ => bail!("Expected key=value, got {assignment:?}"),
    }
}

/// Edit an object's metadata and show the result.
pub async fn meta(
    client: &StorageClient,
    path: &str,
    set: &[String],
    unset: &[String],
    format: &OutputFormat,
) -> Result<()> {
    let (container, object) = split_object_path(path)?;
    let mut changes = Headers::new();
    for assignment in set {
        let (name, value) = parse_assignment(assignment)?;
        changes.insert(name, value);
    }
    let removed: Vec<String> = unset.iter().map(|key| metadata_header_name(key)).collect();
    let removed: Vec<&str> = removed.iter().map(String::as_str).collect();

    let current = client.head_object(&container, &object).await?;
    let headers = current.edited(&changes, &removed);
    client.post_object(&container, &object, &headers).await?;

    let updated = client.head_object(&container, &object).await?;
    print_metadata(&object, &updated, format)
}

/// Delete objects.
pub async fn rm(client: &StorageClient, paths: &[String], format: &OutputFormat) -> Result<()> {
    if paths.is_empty() {
        bail!("Nothing to delete");
    }
    for path in paths {
        let (container, object) = split_object_path(path)?;
        client.delete_object(&container, &object).await?;
        output::print_success(&format!("Deleted {container}/{object}"), format);
    }
    Ok(())
}

/// Empty and delete a container.
pub async fn rmdir(client: &StorageClient, container: &str, format: &OutputFormat) -> Result<()> {
    let container = container.trim_matches('/');
    client.delete_container(container).await?;
    output::print_success(&format!("Deleted container {container}"), format);
    Ok(())
}

/// Server-side copy.
pub async fn cp(
    client: &StorageClient,
    source: &str,
    target: &str,
    format: &OutputFormat,
) -> Result<()> {
    let (container, object) = split_object_path(source)?;
    let (dst_container, dst_object) = resolve_target(target, file_name(&object))?;
    client
        .copy_object(&container, &object, &dst_container, &dst_object)
        .await?;
    output::print_success(
        &format!("Copied {container}/{object} to {dst_container}/{dst_object}"),
        format,
    );
    Ok(())
}

/// Create a container.
pub async fn mkdir(client: &StorageClient, container: &str, format: &OutputFormat) -> Result<()> {
    let container = container.trim_matches('/');
    client.create_container(container).await?;
    output::print_success(&format!("Created container {container}"), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        let pair = |c: &str, o: &str| (c.to_string(), o.to_string());
        assert_eq!(resolve_target("docs", "a.txt").unwrap(), pair("docs", "a.txt"));
        assert_eq!(resolve_target("docs/", "a.txt").unwrap(), pair("docs", "a.txt"));
        assert_eq!(
            resolve_target("/docs/in/", "a.txt").unwrap(),
            pair("docs", "in/a.txt")
        );
        assert_eq!(
            resolve_target("docs/b.txt", "a.txt").unwrap(),
            pair("docs", "b.txt")
        );
    }

    #[test]
    fn test_metadata_header_name() {
        assert_eq!(metadata_header_name("Color"), "x-object-meta-color");
        assert_eq!(metadata_header_name("Content-Type"), "content-type");
        assert_eq!(metadata_header_name("X-Object-Meta-Size"), "x-object-meta-size");
        assert_eq!(metadata_header_name("x-delete-at"), "x-delete-at");
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("color=blue").unwrap(),
            ("x-object-meta-color".to_string(), "blue".to_string())
        );
        assert_eq!(
            parse_assignment("note=a=b").unwrap(),
            ("x-object-meta-note".to_string(), "a=b".to_string())
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }
}
