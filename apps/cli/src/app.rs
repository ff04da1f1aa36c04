//! Wiring of transport, auth coordinator, prompt task and storage client.

use crate::prompt::{spawn_prompt_loop, CredentialSource, TerminalPrompt};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use swift_auth::{AuthCoordinator, AuthStateChangedPayload};
use swift_config_and_utils::AuthProtocol;
use swift_simulator::SwiftSimulator;
use swift_storage::StorageClient;
use swift_transport::{HttpTransport, ReqwestTransport};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Settings resolved from config, environment and flags.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub auth_url: String,
    pub protocol: AuthProtocol,
    pub user: Option<String>,
    pub key: Option<String>,
    pub tenant: Option<String>,
    pub request_timeout: Duration,
    /// Talk to an in-process demo account instead of a real proxy.
    pub simulate: bool,
}

pub struct App {
    pub client: StorageClient,
    pub coordinator: Arc<AuthCoordinator>,
    pub credentials: CredentialSource,
    /// Auth URL pre-filled in the login form.
    pub auth_url: String,
    prompt_task: JoinHandle<()>,
}

impl App {
    pub fn start(options: AppOptions) -> Result<Self> {
        let mut credentials = CredentialSource {
            protocol: options.protocol,
            auth_url: None,
            user: options.user.clone(),
            key: options.key.clone(),
            tenant: options.tenant.clone(),
            hint: None,
        };

        let (transport, default_auth_url): (Arc<dyn HttpTransport>, String) = if options.simulate {
            let simulator = SwiftSimulator::with_demo_data();
            let auth_url = match options.protocol {
                AuthProtocol::Token => simulator.auth_url(),
                AuthProtocol::Keystone => simulator.keystone_url(),
            };
            credentials.hint = Some(match options.protocol {
                AuthProtocol::Token => "Demo account: user test:tester, key testing".to_string(),
                AuthProtocol::Keystone => {
                    "Demo account: tenant test, user tester, password testing".to_string()
                }
            });
            info!(auth_url = %auth_url, "Using simulated Swift account");
            let transport: Arc<dyn HttpTransport> = Arc::new(simulator);
            (transport, auth_url.to_string())
        } else {
            let transport: Arc<dyn HttpTransport> =
                Arc::new(ReqwestTransport::new(options.request_timeout)?);
            (transport, options.auth_url.clone())
        };

        let (prompt, forms) = TerminalPrompt::channel();
        let coordinator = Arc::new(AuthCoordinator::new(
            transport.clone(),
            Arc::new(prompt),
            default_auth_url.clone(),
        ));
        coordinator.set_state_callback(Box::new(|payload: AuthStateChangedPayload| {
            debug!(
                state = ?payload.state,
                pending = payload.pending_requests,
                "Auth state changed"
            );
        }));

        let prompt_task = spawn_prompt_loop(coordinator.clone(), credentials.clone(), forms);
        let client = StorageClient::new(transport, coordinator.clone());

        Ok(Self {
            client,
            coordinator,
            credentials,
            auth_url: default_auth_url,
            prompt_task,
        })
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.prompt_task.abort();
    }
}
