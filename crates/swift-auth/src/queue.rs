//! Requests parked until a login succeeds.

use crate::{AuthError, AuthResult, StorageRequest};
use std::collections::VecDeque;
use swift_transport::HttpResponse;
use tokio::sync::oneshot;

/// A parked request and the channel its caller is waiting on.
pub(crate) struct PendingEntry {
    pub(crate) request: StorageRequest,
    reply: oneshot::Sender<AuthResult<HttpResponse>>,
}

impl PendingEntry {
    /// Deliver the outcome. A caller that stopped waiting is ignored.
    pub(crate) fn resolve(self, result: AuthResult<HttpResponse>) {
        let _ = self.reply.send(result);
    }
}

/// Handle returned to a caller whose request was parked.
#[derive(Debug)]
pub struct PendingReply {
    receiver: oneshot::Receiver<AuthResult<HttpResponse>>,
}

impl PendingReply {
    /// Wait until the request has been replayed after a login.
    ///
    /// Resolves to [`AuthError::Abandoned`] if the login prompt is dismissed
    /// or the coordinator is dropped first.
    pub async fn wait(self) -> AuthResult<HttpResponse> {
        self.receiver.await.unwrap_or(Err(AuthError::Abandoned))
    }
}

/// FIFO of parked requests.
#[derive(Default)]
pub(crate) struct PendingQueue {
    entries: VecDeque<PendingEntry>,
}

impl PendingQueue {
    pub(crate) fn push(&mut self, request: StorageRequest) -> PendingReply {
        let (reply, receiver) = oneshot::channel();
        self.entries.push_back(PendingEntry { request, reply });
        PendingReply { receiver }
    }

    /// Remove every entry, oldest first.
    pub(crate) fn drain(&mut self) -> Vec<PendingEntry> {
        self.entries.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Target;
    use swift_transport::Method;

    fn request(container: &str) -> StorageRequest {
        StorageRequest::new(Method::Get, Target::Container(container.to_string()))
    }

    #[test]
    fn test_drain_is_fifo() {
        let mut queue = PendingQueue::default();
        let _a = queue.push(request("a"));
        let _b = queue.push(request("b"));
        let _c = queue.push(request("c"));
        assert_eq!(queue.len(), 3);

        let order: Vec<String> = queue
            .drain()
            .into_iter()
            .map(|entry| entry.request.target.display_path())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_entry_reaches_caller() {
        let mut queue = PendingQueue::default();
        let reply = queue.push(request("a"));

        for entry in queue.drain() {
            entry.resolve(Ok(HttpResponse::new(204)));
        }

        assert_eq!(reply.wait().await.unwrap().status, 204);
    }

    #[tokio::test]
    async fn test_dropped_entry_reads_as_abandoned() {
        let mut queue = PendingQueue::default();
        let reply = queue.push(request("a"));

        drop(queue.drain());

        assert!(matches!(reply.wait().await, Err(AuthError::Abandoned)));
    }
}
