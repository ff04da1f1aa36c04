//! In-memory account: containers, objects and their headers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use swift_transport::Headers;

pub(crate) const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Most entries one listing page holds, as in a stock Swift proxy.
pub(crate) const DEFAULT_LISTING_LIMIT: usize = 10_000;

/// Headers a client may set on PUT and replace on POST.
pub(crate) fn is_user_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    matches!(
        name.as_str(),
        "content-type" | "content-encoding" | "content-disposition" | "x-delete-at"
    ) || name.starts_with("x-object-meta-")
}

/// Why the account refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refusal {
    NotFound,
    Conflict,
}

impl Refusal {
    pub(crate) fn status(self) -> u16 {
        match self {
            Refusal::NotFound => 404,
            Refusal::Conflict => 409,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    pub(crate) content: Vec<u8>,
    /// Client-settable headers, content-type always present.
    pub(crate) headers: Headers,
    pub(crate) etag: String,
    pub(crate) last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn new(content: Vec<u8>, supplied: &Headers) -> Self {
        let mut headers: Headers = supplied
            .iter()
            .filter(|(name, _)| is_user_header(name))
            .collect();
        if !headers.contains("content-type") {
            headers.insert("content-type", DEFAULT_CONTENT_TYPE);
        }
        let etag = hex::encode(Sha256::digest(&content))[..32].to_string();
        Self {
            content,
            headers,
            etag,
            last_modified: Utc::now(),
        }
    }

    pub(crate) fn content_type(&self) -> &str {
        self.headers.get("content-type").unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Full response header set for HEAD and GET.
    pub(crate) fn response_headers(&self) -> Headers {
        let mut headers = self.headers.clone();
        headers.insert("content-length", self.content.len().to_string());
        headers.insert("etag", self.etag.clone());
        headers.insert(
            "last-modified",
            self.last_modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        );
        headers.insert(
            "x-timestamp",
            format!(
                "{}.{:05}",
                self.last_modified.timestamp(),
                self.last_modified.timestamp_subsec_micros() / 10
            ),
        );
        headers.insert("accept-ranges", "bytes");
        headers
    }

    /// POST semantics: every client header is replaced by the supplied set,
    /// except content-type, which is kept unless a new one is supplied.
    fn replace_metadata(&mut self, supplied: &Headers) {
        let content_type = self.content_type().to_string();
        self.headers = supplied
            .iter()
            .filter(|(name, _)| is_user_header(name))
            .collect();
        if !self.headers.contains("content-type") {
            self.headers.insert("content-type", content_type);
        }
        self.last_modified = Utc::now();
    }

    fn listing(&self, name: &str) -> ListingEntry {
        ListingEntry::Object {
            name: name.to_string(),
            bytes: self.content.len() as u64,
            last_modified: self
                .last_modified
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            content_type: self.content_type().to_string(),
            hash: self.etag.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Container {
    pub(crate) objects: BTreeMap<String, StoredObject>,
}

impl Container {
    pub(crate) fn bytes_used(&self) -> u64 {
        self.objects.values().map(|o| o.content.len() as u64).sum()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ContainerListing {
    pub(crate) name: String,
    pub(crate) count: u64,
    pub(crate) bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ListingEntry {
    Object {
        name: String,
        bytes: u64,
        last_modified: String,
        content_type: String,
        hash: String,
    },
    Subdir {
        subdir: String,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Account {
    containers: BTreeMap<String, Container>,
}

impl Account {
    pub(crate) fn containers(&self) -> Vec<ContainerListing> {
        self.containers
            .iter()
            .map(|(name, container)| ContainerListing {
                name: name.clone(),
                count: container.objects.len() as u64,
                bytes: container.bytes_used(),
            })
            .collect()
    }

    pub(crate) fn bytes_used(&self) -> u64 {
        self.containers.values().map(Container::bytes_used).sum()
    }

    pub(crate) fn object_count(&self) -> u64 {
        self.containers.values().map(|c| c.objects.len() as u64).sum()
    }

    pub(crate) fn container(&self, name: &str) -> Result<&Container, Refusal> {
        self.containers.get(name).ok_or(Refusal::NotFound)
    }

    /// Returns true if the container was created, false if it existed.
    pub(crate) fn create_container(&mut self, name: &str) -> bool {
        if self.containers.contains_key(name) {
            return false;
        }
        self.containers.insert(name.to_string(), Container::default());
        true
    }

    pub(crate) fn delete_container(&mut self, name: &str) -> Result<(), Refusal> {
        let container = self.container(name)?;
        if !container.objects.is_empty() {
            return Err(Refusal::Conflict);
        }
        self.containers.remove(name);
        Ok(())
    }

    /// Objects and pseudo-directories under `prefix`, in name order.
    ///
    /// With a delimiter, every name whose remainder after `prefix` contains
    /// the delimiter collapses into one `subdir` entry ending at the first
    /// occurrence. The page holds at most `limit` entries named after
    /// `marker`.
    pub(crate) fn list_objects(
        &self,
        container: &str,
        prefix: &str,
        delimiter: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ListingEntry>, Refusal> {
        let container = self.container(container)?;
        let delimiter = delimiter.filter(|d| !d.is_empty());
        let mut entries: BTreeMap<String, ListingEntry> = BTreeMap::new();

        for (name, object) in container
            .objects
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
        {
            if let Some(delimiter) = delimiter {
                let rest = &name[prefix.len()..];
                if let Some(index) = rest.find(delimiter) {
                    let subdir = format!("{prefix}{}", &rest[..index + delimiter.len()]);
                    entries
                        .entry(subdir.clone())
                        .or_insert(ListingEntry::Subdir { subdir });
                    continue;
                }
            }
            entries.insert(name.clone(), object.listing(name));
        }

        Ok(entries
            .into_iter()
            .filter(|(name, _)| marker.map_or(true, |marker| name.as_str() > marker))
            .take(limit)
            .map(|(_, entry)| entry)
            .collect())
    }

    pub(crate) fn object(&self, container: &str, name: &str) -> Result<&StoredObject, Refusal> {
        self.container(container)?
            .objects
            .get(name)
            .ok_or(Refusal::NotFound)
    }

    pub(crate) fn put_object(
        &mut self,
        container: &str,
        name: &str,
        content: Vec<u8>,
        headers: &Headers,
    ) -> Result<&StoredObject, Refusal> {
        let container = self.containers.get_mut(container).ok_or(Refusal::NotFound)?;
        let object = StoredObject::new(content, headers);
        container.objects.insert(name.to_string(), object);
        container.objects.get(name).ok_or(Refusal::NotFound)
    }

    pub(crate) fn post_object(
        &mut self,
        container: &str,
        name: &str,
        headers: &Headers,
    ) -> Result<(), Refusal> {
        let object = self
            .containers
            .get_mut(container)
            .and_then(|c| c.objects.get_mut(name))
            .ok_or(Refusal::NotFound)?;
        object.replace_metadata(headers);
        Ok(())
    }

    pub(crate) fn delete_object(&mut self, container: &str, name: &str) -> Result<(), Refusal> {
        self.containers
            .get_mut(container)
            .and_then(|c| c.objects.remove(name))
            .map(|_| ())
            .ok_or(Refusal::NotFound)
    }

    /// Server-side copy; content and client headers travel with the object.
    pub(crate) fn copy_object(
        &mut self,
        source: (&str, &str),
        destination: (&str, &str),
    ) -> Result<(), Refusal> {
        let mut copied = self.object(source.0, source.1)?.clone();
        copied.last_modified = Utc::now();
        let target = self
            .containers
            .get_mut(destination.0)
            .ok_or(Refusal::NotFound)?;
        target.objects.insert(destination.1.to_string(), copied);
        Ok(())
    }
}
