//! Shared fixture: storage client + auth coordinator over the simulator.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use swift_auth::{
    AuthCoordinator, Credentials, KeystoneCredentials, LoginForm, LoginPrompt, TokenCredentials,
};
use swift_simulator::SwiftSimulator;
use swift_storage::StorageClient;
use swift_transport::{HttpRequest, HttpResponse, HttpTransport, Method, TransportResult};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

/// Forwards to the simulator and keeps a copy of every request.
pub struct RecordingTransport {
    inner: Arc<SwiftSimulator>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests with the given method whose path ends with `suffix`.
    pub fn matching(&self, method: Method, suffix: &str) -> Vec<HttpRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.method == method && r.url.path().ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        self.sent.lock().unwrap().push(request.clone());
        self.inner.send(request).await
    }
}

/// Prompt that reports each opening on a channel.
pub struct ChannelPrompt {
    tx: mpsc::UnboundedSender<LoginForm>,
}

impl LoginPrompt for ChannelPrompt {
    fn open(&self, form: LoginForm) {
        let _ = self.tx.send(form);
    }
}

pub struct Fixture {
    pub simulator: Arc<SwiftSimulator>,
    pub transport: Arc<RecordingTransport>,
    pub coordinator: Arc<AuthCoordinator>,
    pub client: StorageClient,
    prompts: AsyncMutex<mpsc::UnboundedReceiver<LoginForm>>,
}

impl Fixture {
    pub fn new() -> Self {
        let simulator = Arc::new(SwiftSimulator::new());
        let transport = Arc::new(RecordingTransport {
            inner: simulator.clone(),
            sent: Mutex::new(Vec::new()),
        });
        let (tx, prompts) = mpsc::unbounded_channel();
        let coordinator = Arc::new(AuthCoordinator::new(
            transport.clone(),
            Arc::new(ChannelPrompt { tx }),
            simulator.auth_url().to_string(),
        ));
        let client = StorageClient::new(transport.clone(), coordinator.clone());
        Self {
            simulator,
            transport,
            coordinator,
            client,
            prompts: AsyncMutex::new(prompts),
        }
    }

    /// Fixture with a session already established.
    pub async fn logged_in() -> Self {
        let fixture = Self::new();
        fixture
            .coordinator
            .authenticate(&fixture.credentials())
            .await
            .unwrap();
        fixture.simulator.clear_log();
        fixture
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials_with_key("testing")
    }

    pub fn credentials_with_key(&self, key: &str) -> Credentials {
        Credentials::Token(TokenCredentials {
            auth_url: self.simulator.auth_url(),
            auth_user: "test:tester".to_string(),
            auth_key: key.to_string(),
        })
    }

    pub fn keystone_credentials(&self) -> Credentials {
        Credentials::Keystone(KeystoneCredentials {
            auth_url: self.simulator.keystone_url(),
            tenant: "test".to_string(),
            username: "tester".to_string(),
            password: "testing".to_string(),
        })
    }

    /// Wait until the login prompt opens.
    pub async fn next_prompt(&self) -> LoginForm {
        self.prompts.lock().await.recv().await.unwrap()
    }

    /// Wait for the login prompt, then log in.
    pub async fn answer_prompt(&self) -> LoginForm {
        let form = self.next_prompt().await;
        self.coordinator
            .authenticate(&self.credentials())
            .await
            .unwrap();
        form
    }

    /// Prompt openings not yet consumed by a test.
    pub async fn unanswered_prompts(&self) -> usize {
        let mut prompts = self.prompts.lock().await;
        let mut count = 0;
        while prompts.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    /// Number of login requests the simulator received.
    pub fn login_count(&self) -> usize {
        self.simulator
            .request_log()
            .iter()
            .filter(|line| line.starts_with("GET /auth/") || line.starts_with("POST /v2.0/"))
            .count()
    }
}
