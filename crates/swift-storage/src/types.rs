//! Records exchanged with the storage API.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use swift_transport::Headers;

/// One entry of the account listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    /// Number of objects.
    pub count: u64,
    /// Bytes used by all objects.
    pub bytes: u64,
}

/// A stored object as it appears in a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    pub bytes: u64,
    pub last_modified: NaiveDateTime,
    pub content_type: String,
    pub hash: String,
}

/// Container listing entry: a real object or a pseudo-directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectEntry {
    Subdir { subdir: String },
    Object(ObjectInfo),
}

impl ObjectEntry {
    /// Full name: object name, or the subdir prefix with its trailing delimiter.
    pub fn name(&self) -> &str {
        match self {
            ObjectEntry::Subdir { subdir } => subdir,
            ObjectEntry::Object(info) => &info.name,
        }
    }

    pub fn is_subdir(&self) -> bool {
        matches!(self, ObjectEntry::Subdir { .. })
    }

    pub fn as_object(&self) -> Option<&ObjectInfo> {
        match self {
            ObjectEntry::Object(info) => Some(info),
            ObjectEntry::Subdir { .. } => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectInfo> {
        match self {
            ObjectEntry::Object(info) => Some(info),
            ObjectEntry::Subdir { .. } => None,
        }
    }
}

/// Filter for an object listing.
///
/// `prefix` is always sent, empty meaning "everything". Without a
/// `delimiter` the listing is full depth; with one, names sharing a prefix
/// up to the delimiter collapse into [`ObjectEntry::Subdir`] entries.
/// A `marker` starts the page after that name; the server caps each page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsParams {
    pub prefix: String,
    pub delimiter: Option<String>,
    pub marker: Option<String>,
}

impl ListObjectsParams {
    /// One level of the pseudo-directory tree under `prefix`.
    pub fn directory(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: Some("/".to_string()),
            marker: None,
        }
    }

    /// The same listing, continued after `name`.
    pub fn after(&self, name: impl Into<String>) -> Self {
        Self {
            marker: Some(name.into()),
            ..self.clone()
        }
    }
}

/// Body and headers of a downloaded object, exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectContent {
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl ObjectContent {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

const EDITABLE_HEADERS: &[&str] = &[
    "content-type",
    "content-encoding",
    "content-disposition",
    "x-delete-at",
];

const USER_METADATA_PREFIX: &str = "x-object-meta-";

/// Headers of an object as returned by HEAD.
///
/// Split into the headers a client may change with POST and the read-only
/// system headers the server maintains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    headers: Headers,
}

impl ObjectMetadata {
    pub fn from_headers(headers: Headers) -> Self {
        Self { headers }
    }

    /// Whether a header can be changed through POST.
    pub fn is_editable(name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        EDITABLE_HEADERS.contains(&name.as_str()) || name.starts_with(USER_METADATA_PREFIX)
    }

    /// All headers, as received.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn editable(&self) -> Headers {
        self.headers
            .iter()
            .filter(|(name, _)| Self::is_editable(name))
            .collect()
    }

    pub fn system(&self) -> Headers {
        self.headers
            .iter()
            .filter(|(name, _)| !Self::is_editable(name))
            .collect()
    }

    /// `x-object-meta-*` entries with the prefix removed.
    pub fn user_metadata(&self) -> Vec<(&str, &str)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(USER_METADATA_PREFIX)
                    .map(|key| (key, value))
            })
            .collect()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers.get("content-length")?.parse().ok()
    }

    pub fn etag(&self) -> Option<&str> {
        self.headers.get("etag")
    }

    pub fn last_modified(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc2822(self.headers.get("last-modified")?).ok()
    }

    /// The header set to POST so that the object ends up with the current
    /// editable headers plus `set`, minus `unset`.
    ///
    /// POST replaces every editable header, so unchanged ones are resent.
    pub fn edited(&self, set: &Headers, unset: &[&str]) -> Headers {
        let mut headers = self.editable();
        for name in unset {
            headers.remove(name);
        }
        headers.merge(set);
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_entries_decode_objects_and_subdirs() {
        let listing = json!([
            {"subdir": "a/b/"},
            {
                "name": "a/x.txt",
                "bytes": 5,
                "last_modified": "2024-03-01T12:30:00.123456",
                "content_type": "text/plain",
                "hash": "5d41402abc4b2a76b9719d911017c592"
            }
        ]);

        let entries: Vec<ObjectEntry> = serde_json::from_value(listing).unwrap();

        assert_eq!(
            entries[0],
            ObjectEntry::Subdir {
                subdir: "a/b/".to_string()
            }
        );
        let object = entries[1].as_object().unwrap();
        assert_eq!(object.name, "a/x.txt");
        assert_eq!(object.bytes, 5);
        assert_eq!(object.last_modified.to_string(), "2024-03-01 12:30:00.123456");
        assert_eq!(entries[1].name(), "a/x.txt");
        assert!(entries[0].is_subdir());
    }

    #[test]
    fn test_editable_header_split() {
        let metadata = ObjectMetadata::from_headers(
            [
                ("Content-Type", "text/plain"),
                ("Content-Length", "12"),
                ("ETag", "abc"),
                ("X-Object-Meta-Color", "blue"),
                ("X-Delete-At", "1700000000"),
                ("X-Timestamp", "1699999999.00000"),
            ]
            .into_iter()
            .collect(),
        );

        let editable = metadata.editable();
        let names: Vec<&str> = editable.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["content-type", "x-delete-at", "x-object-meta-color"]
        );
        assert!(metadata.system().contains("etag"));
        assert!(!metadata.system().contains("x-object-meta-color"));
        assert_eq!(metadata.user_metadata(), vec![("color", "blue")]);
        assert_eq!(metadata.content_length(), Some(12));
    }

    #[test]
    fn test_edited_resends_unchanged_editable_headers() {
        let metadata = ObjectMetadata::from_headers(
            [
                ("Content-Type", "text/plain"),
                ("X-Object-Meta-Keep", "1"),
                ("X-Object-Meta-Drop", "2"),
                ("ETag", "abc"),
            ]
            .into_iter()
            .collect(),
        );
        let set: Headers = [("X-Object-Meta-New", "3")].into_iter().collect();

        let post = metadata.edited(&set, &["x-object-meta-drop"]);

        assert_eq!(post.get("content-type"), Some("text/plain"));
        assert_eq!(post.get("x-object-meta-keep"), Some("1"));
        assert_eq!(post.get("x-object-meta-new"), Some("3"));
        assert!(!post.contains("x-object-meta-drop"));
        assert!(!post.contains("etag"));
    }

    #[test]
    fn test_last_modified_parses_http_date() {
        let metadata = ObjectMetadata::from_headers(
            [("Last-Modified", "Fri, 01 Mar 2024 12:30:00 GMT")]
                .into_iter()
                .collect(),
        );
        let parsed = metadata.last_modified().unwrap();
        assert_eq!(parsed.timestamp(), 1_709_296_200);
    }

    #[test]
    fn test_directory_params() {
        let params = ListObjectsParams::directory("a/");
        assert_eq!(params.prefix, "a/");
        assert_eq!(params.delimiter.as_deref(), Some("/"));
        assert_eq!(ListObjectsParams::default().delimiter, None);

        let next = params.after("a/m.txt");
        assert_eq!(next.prefix, "a/");
        assert_eq!(next.marker.as_deref(), Some("a/m.txt"));
        assert_eq!(params.marker, None);
    }
}
