//! Read-only commands: listings, downloads and metadata display.

use super::{headers_json, split_object_path};
use crate::output::{self, OutputFormat};
use crate::views::{item_title, render_breadcrumbs, Location, SortState};
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use swift_storage::{
    ContainerInfo, ListObjectsParams, ObjectEntry, ObjectMetadata, StorageClient,
};
use tracing::info;

/// List the containers of the account.
pub async fn containers(
    client: &StorageClient,
    sort: SortState,
    format: &OutputFormat,
) -> Result<()> {
    let mut listing = client.list_containers().await?;
    sort.sort_containers(&mut listing);
    print_containers(&listing, format)
}

pub fn print_containers(listing: &[ContainerInfo], format: &OutputFormat) -> Result<()> {
    if *format == OutputFormat::Json {
        return output::print_json(&listing);
    }
    output::print_heading("Containers");
    if listing.is_empty() {
        println!("  (no containers)");
    }
    for container in listing {
        println!(
            "  {:<40} {:>8} objects {:>12}",
            container.name,
            container.count,
            output::format_bytes(container.bytes)
        );
    }
    Ok(())
}

/// List one pseudo-directory level, or the whole container with `recursive`.
pub async fn ls(
    client: &StorageClient,
    path: &str,
    recursive: bool,
    sort: SortState,
    format: &OutputFormat,
) -> Result<()> {
    let location = Location::parse(path);
    let Location::Container { container, prefix } = &location else {
        return containers(client, sort, format).await;
    };

    let params = if recursive {
        ListObjectsParams {
            prefix: prefix.clone(),
            ..ListObjectsParams::default()
        }
    } else {
        ListObjectsParams::directory(prefix.clone())
    };
    let mut entries = client.list_objects(container, &params).await?;
    sort.sort_entries(&mut entries);
    print_entries(&location, &entries, recursive, None, format)
}

/// Print a listing. `is_selected` marks selected entries in the shell.
pub fn print_entries(
    location: &Location,
    entries: &[ObjectEntry],
    full_names: bool,
    is_selected: Option<&dyn Fn(&str) -> bool>,
    format: &OutputFormat,
) -> Result<()> {
    if *format == OutputFormat::Json {
        return output::print_json(&entries);
    }

    println!("\n{}", render_breadcrumbs(location));
    output::print_heading(&location.title());
    if entries.is_empty() {
        println!("  (empty)");
    }
    for entry in entries {
        let marker = match is_selected {
            Some(selected) if selected(entry.name()) => "*",
            _ => " ",
        };
        let title = if full_names {
            entry.name().to_string()
        } else {
            item_title(entry)
        };
        match entry {
            ObjectEntry::Subdir { .. } => println!("{marker} {title:<48} {:>10}", "-"),
            ObjectEntry::Object(info) => println!(
                "{marker} {title:<48} {:>10}  {}  {}",
                output::format_bytes(info.bytes),
                info.last_modified.format("%Y-%m-%d %H:%M:%S"),
                info.content_type
            ),
        }
    }
    Ok(())
}

/// Download an object to `destination`, to stdout for `-`, or into the
/// downloads directory by default.
pub async fn get(
    client: &StorageClient,
    path: &str,
    destination: Option<&Path>,
    downloads_dir: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let (container, object) = split_object_path(path)?;
    let content = client.get_object(&container, &object).await?;

    if destination == Some(Path::new("-")) {
        let mut stdout = std::io::stdout();
        stdout.write_all(&content.body)?;
        stdout.flush()?;
        return Ok(());
    }

    let target = match destination {
        Some(path) => path.to_path_buf(),
        None => {
            std::fs::create_dir_all(downloads_dir)?;
            downloads_dir.join(download_name(&object))
        }
    };
    std::fs::write(&target, &content.body)
        .with_context(|| format!("Could not write {}", target.display()))?;
    info!(%container, %object, bytes = content.body.len(), "Object downloaded");

    match format {
        OutputFormat::Json => output::print_json(&json!({
            "container": container,
            "object": object,
            "bytes": content.body.len(),
            "content_type": content.content_type(),
            "path": target,
        }))?,
        OutputFormat::Text => output::print_success(
            &format!(
                "Downloaded {} ({}) to {}",
                object,
                output::format_bytes(content.body.len() as u64),
                target.display()
            ),
            format,
        ),
    }
    Ok(())
}

fn download_name(object: &str) -> PathBuf {
    PathBuf::from(object.rsplit('/').next().unwrap_or(object))
}

/// Show an object's headers, editable ones first.
pub async fn head(client: &StorageClient, path: &str, format: &OutputFormat) -> Result<()> {
    let (container, object) = split_object_path(path)?;
    let metadata = client.head_object(&container, &object).await?;
    print_metadata(&object, &metadata, format)
}

pub fn print_metadata(object: &str, metadata: &ObjectMetadata, format: &OutputFormat) -> Result<()> {
    if *format == OutputFormat::Json {
        return output::print_json(&json!({
            "object": object,
            "editable": headers_json(&metadata.editable()),
            "system": headers_json(&metadata.system()),
        }));
    }

    output::print_heading(object);
    println!("  Editable");
    for (name, value) in metadata.editable().iter() {
        output::print_row(name, value);
    }
    println!("  System");
    for (name, value) in metadata.system().iter() {
        output::print_row(name, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_name_uses_last_component() {
        assert_eq!(download_name("a/b/c.txt"), PathBuf::from("c.txt"));
        assert_eq!(download_name("top.txt"), PathBuf::from("top.txt"));
    }
}
