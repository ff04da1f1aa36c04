//! Storage client: one method per Swift primitive.
//!
//! Every call goes through [`StorageClient::execute`], which sends the
//! request with the current session, hands it to the auth coordinator when
//! there is no session or the server answers 401, and classifies the final
//! status. Callers never see a 401 unless a login could not fix it.

use crate::{
    ContainerInfo, ListObjectsParams, ObjectContent, ObjectEntry, ObjectMetadata, StorageError,
    StorageResult,
};
use futures_util::future::join_all;
use std::sync::Arc;
use swift_auth::{Admission, AuthCoordinator, AuthError, StorageRequest, Target};
use swift_transport::{summarize_body, Headers, HttpResponse, HttpTransport, Method};
use tracing::{debug, error, info, warn};

/// Header naming the target of a server-side copy.
pub const DESTINATION_HEADER: &str = "Destination";

/// Entries in a full listing page of a stock Swift proxy.
pub const LISTING_PAGE_LIMIT: usize = 10_000;

/// Swift REST binding over a transport and an auth coordinator.
#[derive(Clone)]
pub struct StorageClient {
    transport: Arc<dyn HttpTransport>,
    coordinator: Arc<AuthCoordinator>,
    listing_page_limit: usize,
}

impl StorageClient {
    pub fn new(transport: Arc<dyn HttpTransport>, coordinator: Arc<AuthCoordinator>) -> Self {
        Self {
            transport,
            coordinator,
            listing_page_limit: LISTING_PAGE_LIMIT,
        }
    }

    /// Page size of a proxy whose listing limit is not the default.
    pub fn with_listing_page_limit(mut self, limit: usize) -> Self {
        self.listing_page_limit = limit.max(1);
        self
    }

    pub fn coordinator(&self) -> &Arc<AuthCoordinator> {
        &self.coordinator
    }

    /// `GET {endpoint}?format=json`
    pub async fn list_containers(&self) -> StorageResult<Vec<ContainerInfo>> {
        let request =
            StorageRequest::new(Method::Get, Target::Account).with_query("format", "json");
        let response = self.execute(request).await?;
        decode_listing(&response)
    }

    /// `GET {endpoint}/{container}?format=json&prefix=..[&delimiter=..][&marker=..]`
    ///
    /// Returns one page; continue with [`ListObjectsParams::after`].
    pub async fn list_objects(
        &self,
        container: &str,
        params: &ListObjectsParams,
    ) -> StorageResult<Vec<ObjectEntry>> {
        validate_container(container)?;
        let mut request = StorageRequest::new(Method::Get, Target::Container(container.to_string()))
            .with_query("format", "json")
            .with_query("prefix", params.prefix.as_str());
        if let Some(delimiter) = &params.delimiter {
            request = request.with_query("delimiter", delimiter.as_str());
        }
        if let Some(marker) = &params.marker {
            request = request.with_query("marker", marker.as_str());
        }
        let response = self.execute(request).await?;
        decode_listing(&response)
    }

    /// `GET {endpoint}/{container}/{object}`; the body is returned untouched.
    pub async fn get_object(&self, container: &str, object: &str) -> StorageResult<ObjectContent> {
        let target = object_target(container, object)?;
        let response = self.execute(StorageRequest::new(Method::Get, target)).await?;
        Ok(ObjectContent {
            headers: response.headers,
            body: response.body,
        })
    }

    /// `HEAD {endpoint}/{container}/{object}`
    pub async fn head_object(&self, container: &str, object: &str) -> StorageResult<ObjectMetadata> {
        let target = object_target(container, object)?;
        let response = self.execute(StorageRequest::new(Method::Head, target)).await?;
        Ok(ObjectMetadata::from_headers(response.headers))
    }

    /// `POST {endpoint}/{container}/{object}` with exactly `headers`.
    ///
    /// Swift replaces every editable header of the object with the posted
    /// set; see [`ObjectMetadata::edited`].
    pub async fn post_object(
        &self,
        container: &str,
        object: &str,
        headers: &Headers,
    ) -> StorageResult<()> {
        let target = object_target(container, object)?;
        let request = StorageRequest::new(Method::Post, target).with_headers(headers);
        self.execute(request).await?;
        Ok(())
    }

    /// `PUT {endpoint}/{container}/{object}` with a raw body. Returns the
    /// stored object's etag, if the server sent one.
    pub async fn upload_object(
        &self,
        container: &str,
        object: &str,
        body: Vec<u8>,
        headers: &Headers,
    ) -> StorageResult<Option<String>> {
        let target = object_target(container, object)?;
        let size = body.len();
        let request = StorageRequest::new(Method::Put, target)
            .with_headers(headers)
            .with_body(body);
        let response = self.execute(request).await?;
        info!(container, object, size, "Object uploaded");
        Ok(response.headers.get("etag").map(str::to_string))
    }

    /// `DELETE {endpoint}/{container}/{object}`
    pub async fn delete_object(&self, container: &str, object: &str) -> StorageResult<()> {
        let target = object_target(container, object)?;
        self.execute(StorageRequest::new(Method::Delete, target))
            .await?;
        Ok(())
    }

    /// `PUT {endpoint}/{container}`
    pub async fn create_container(&self, container: &str) -> StorageResult<()> {
        validate_container(container)?;
        let request = StorageRequest::new(Method::Put, Target::Container(container.to_string()));
        self.execute(request).await?;
        info!(container, "Container created");
        Ok(())
    }

    /// Empty a container and delete it.
    ///
    /// Lists every object at full depth, deletes them, and only once every
    /// delete has finished removes the container. A full listing page is
    /// followed by the next one, starting after its last name. If any object
    /// delete fails the container is left in place, partially emptied.
    pub async fn delete_container(&self, container: &str) -> StorageResult<()> {
        validate_container(container)?;
        let mut params = ListObjectsParams::default();
        let mut deleted = 0usize;

        loop {
            let names: Vec<String> = self
                .list_objects(container, &params)
                .await?
                .into_iter()
                .filter_map(ObjectEntry::into_object)
                .map(|info| info.name)
                .collect();
            let full_page = names.len() >= self.listing_page_limit;

            debug!(container, objects = names.len(), "Emptying container");
            let results =
                join_all(names.iter().map(|name| self.delete_object(container, name))).await;

            for (name, result) in names.iter().zip(results) {
                if let Err(e) = result {
                    warn!(container, object = %name, error = %e, "Object delete failed, keeping container");
                    return Err(StorageError::ContainerNotEmptied {
                        container: container.to_string(),
                        object: name.clone(),
                        source: Box::new(e),
                    });
                }
            }
            deleted += names.len();

            match names.last() {
                Some(last) if full_page => params = params.after(last.as_str()),
                _ => break,
            }
        }

        let request = StorageRequest::new(Method::Delete, Target::Container(container.to_string()));
        self.execute(request).await?;
        info!(container, objects = deleted, "Container deleted");
        Ok(())
    }

    /// `COPY {endpoint}/{container}/{object}` with
    /// `Destination: {dst_container}/{dst_object}`.
    pub async fn copy_object(
        &self,
        container: &str,
        object: &str,
        dst_container: &str,
        dst_object: &str,
    ) -> StorageResult<()> {
        let target = object_target(container, object)?;
        validate_container(dst_container)?;
        validate_object(dst_object)?;
        let request = StorageRequest::new(Method::Copy, target)
            .with_header(DESTINATION_HEADER, destination(dst_container, dst_object));
        self.execute(request).await?;
        Ok(())
    }

    /// Send `request`, going through the coordinator whenever the session
    /// is missing or rejected.
    ///
    /// A 401 is retried once directly if a login completed while the request
    /// was in flight; otherwise the request is parked and its replayed
    /// response is used. A replay that is itself rejected is an auth error.
    async fn execute(&self, request: StorageRequest) -> StorageResult<HttpResponse> {
        let method = request.method;
        let resource = request.target.display_path();
        let mut admission = self.coordinator.admit(request)?;
        let mut retried = false;

        let response = loop {
            match admission {
                Admission::Parked(reply) => {
                    debug!(%method, resource = %resource, "Waiting for login");
                    break reply.wait().await?;
                }
                Admission::Ready { request, session } => {
                    let http = request.resolve(&session.storage_endpoint, &session.bearer_headers);
                    debug!(%method, url = %http.url, "Storage request");
                    let response = self.transport.send(http).await?;
                    if !response.is_unauthorized() {
                        break response;
                    }

                    warn!(%method, resource = %resource, "Storage request rejected, session expired");
                    admission = if retried {
                        Admission::Parked(self.coordinator.request_auth(request)?)
                    } else {
                        retried = true;
                        self.coordinator.readmit(request, session.token())?
                    };
                }
            }
        };

        check_status(response, &resource)
    }
}

fn check_status(response: HttpResponse, resource: &str) -> StorageResult<HttpResponse> {
    let status = response.status;
    if response.is_success() {
        return Ok(response);
    }

    let body = response.text();
    match status {
        401 => Err(StorageError::Auth(AuthError::Unauthorized { status, body })),
        404 => Err(StorageError::NotFound {
            resource: if resource.is_empty() {
                "account".to_string()
            } else {
                resource.to_string()
            },
        }),
        500..=599 => {
            error!(
                status,
                resource,
                body = %summarize_body(&response.body),
                "Storage server error"
            );
            Err(StorageError::Server { status, body })
        }
        _ => {
            warn!(
                status,
                resource,
                body = %summarize_body(&response.body),
                "Unexpected storage status"
            );
            Err(StorageError::UnexpectedStatus { status, body })
        }
    }
}

/// Decode a JSON listing. An empty 2xx body (Swift answers 204 for an
/// empty listing on some deployments) is an empty list.
fn decode_listing<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> StorageResult<Vec<T>> {
    if response.status == 204 || response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(response.json()?)
}

fn validate_container(container: &str) -> StorageResult<()> {
    if container.is_empty() {
        return Err(StorageError::InvalidName("container name is empty".to_string()));
    }
    if container.contains('/') {
        return Err(StorageError::InvalidName(format!(
            "container name {container:?} contains '/'"
        )));
    }
    Ok(())
}

fn validate_object(object: &str) -> StorageResult<()> {
    if object.is_empty() {
        return Err(StorageError::InvalidName("object name is empty".to_string()));
    }
    Ok(())
}

fn object_target(container: &str, object: &str) -> StorageResult<Target> {
    validate_container(container)?;
    validate_object(object)?;
    Ok(Target::object(container, object))
}

/// `container/object`, each path segment percent-encoded.
fn destination(container: &str, object: &str) -> String {
    let object: Vec<String> = object
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", urlencoding::encode(container), object.join("/"))
}
