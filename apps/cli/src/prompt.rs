//! Terminal login prompt.
//!
//! The coordinator opens the prompt by sending a [`LoginForm`] down a
//! channel; a background task answers each form by reading credentials
//! (from flags first, then from the terminal) and calling `authenticate`,
//! or `abandon` when the user gives up.

use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use swift_auth::{
    AuthCoordinator, AuthError, Credentials, KeystoneCredentials, LoginForm, LoginPrompt,
    TokenCredentials,
};
use swift_config_and_utils::AuthProtocol;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Login attempts per prompt before the pending requests are abandoned.
const MAX_ATTEMPTS: usize = 3;

/// [`LoginPrompt`] that forwards forms to the prompt task.
pub struct TerminalPrompt {
    forms: mpsc::UnboundedSender<LoginForm>,
}

impl TerminalPrompt {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LoginForm>) {
        let (forms, receiver) = mpsc::unbounded_channel();
        (Self { forms }, receiver)
    }
}

impl LoginPrompt for TerminalPrompt {
    fn open(&self, form: LoginForm) {
        debug!(pending = form.pending_requests, "Login prompt opened");
        if self.forms.send(form).is_err() {
            warn!("Login prompt task is gone, form dropped");
        }
    }
}

/// Where credentials come from when the prompt opens.
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    pub protocol: AuthProtocol,
    /// Auth URL given on the command line; otherwise the form's is used.
    pub auth_url: Option<String>,
    /// `account:user` for token auth, user name for Keystone.
    pub user: Option<String>,
    pub key: Option<String>,
    /// Keystone tenant.
    pub tenant: Option<String>,
    /// Printed above the interactive prompt.
    pub hint: Option<String>,
}

impl CredentialSource {
    /// Credentials fully given by flags, if any.
    fn preset(&self, form: &LoginForm) -> Option<Result<Credentials>> {
        let user = self.user.as_deref()?;
        let key = self.key.as_deref()?;
        let auth_url = self.auth_url.as_deref().unwrap_or(&form.auth_url);
        Some(build_credentials(
            self.protocol,
            auth_url,
            user,
            key,
            self.tenant.as_deref(),
        ))
    }
}

/// Build credentials for `protocol`.
///
/// For Keystone without an explicit tenant, `user` may be `tenant:user`.
pub fn build_credentials(
    protocol: AuthProtocol,
    auth_url: &str,
    user: &str,
    key: &str,
    tenant: Option<&str>,
) -> Result<Credentials> {
    let auth_url = Url::parse(auth_url.trim())
        .with_context(|| format!("Invalid auth URL: {auth_url}"))?;
    if user.trim().is_empty() {
        bail!("User is required");
    }
    if key.is_empty() {
        bail!("Key is required");
    }

    Ok(match protocol {
        AuthProtocol::Token => Credentials::Token(TokenCredentials {
            auth_url,
            auth_user: user.trim().to_string(),
            auth_key: key.to_string(),
        }),
        AuthProtocol::Keystone => {
            let (tenant, username) = match (tenant, user.trim().split_once(':')) {
                (Some(tenant), _) => (tenant.to_string(), user.trim().to_string()),
                (None, Some((tenant, username))) => (tenant.to_string(), username.to_string()),
                (None, None) => (String::new(), user.trim().to_string()),
            };
            Credentials::Keystone(KeystoneCredentials {
                auth_url,
                tenant,
                username,
                password: key.to_string(),
            })
        }
    })
}

/// Spawn the task answering login forms until the prompt is dropped.
pub fn spawn_prompt_loop(
    coordinator: Arc<AuthCoordinator>,
    source: CredentialSource,
    mut forms: mpsc::UnboundedReceiver<LoginForm>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(form) = forms.recv().await {
            run_login(&coordinator, &source, form).await;
        }
        debug!("Login prompt task stopped");
    })
}

/// Answer one login form. Returns whether a login succeeded.
pub async fn run_login(
    coordinator: &AuthCoordinator,
    source: &CredentialSource,
    form: LoginForm,
) -> bool {
    if form.pending_requests > 0 {
        eprintln!(
            "Login required ({} request(s) waiting)",
            form.pending_requests
        );
    }
    let mut preset = source.preset(&form);

    for attempt in 1..=MAX_ATTEMPTS {
        let credentials = match preset.take() {
            Some(credentials) => credentials,
            None => read_credentials(source, &form).await,
        };
        let credentials = match credentials {
            Ok(credentials) => credentials,
            Err(e) => {
                eprintln!("Login cancelled: {e}");
                break;
            }
        };

        match coordinator.authenticate(&credentials).await {
            Ok(_) => {
                info!(attempt, protocol = credentials.protocol_name(), "Login succeeded");
                return true;
            }
            Err(AuthError::LoginInProgress) => {
                debug!("Another login is running, prompt closed");
                return false;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Login failed");
                eprintln!("Login failed: {e}");
            }
        }
    }

    match coordinator.abandon() {
        Ok(dropped) => {
            info!(dropped, "Login abandoned");
            if dropped > 0 {
                eprintln!("Login abandoned, {dropped} request(s) cancelled");
            }
        }
        Err(e) => warn!(error = %e, "Could not abandon login"),
    }
    false
}

async fn read_credentials(source: &CredentialSource, form: &LoginForm) -> Result<Credentials> {
    let source = source.clone();
    let form = form.clone();
    tokio::task::spawn_blocking(move || read_credentials_blocking(&source, &form)).await?
}

fn read_credentials_blocking(source: &CredentialSource, form: &LoginForm) -> Result<Credentials> {
    if let Some(hint) = &source.hint {
        eprintln!("{hint}");
    }
    let default_url = source.auth_url.as_deref().unwrap_or(&form.auth_url);
    let auth_url = read_line(&format!("Auth URL [{default_url}]: "))?;
    let auth_url = if auth_url.is_empty() {
        default_url.to_string()
    } else {
        auth_url
    };

    let tenant = match (source.protocol, &source.tenant) {
        (AuthProtocol::Keystone, None) => Some(read_line("Tenant: ")?),
        (_, tenant) => tenant.clone(),
    };
    let user = match &source.user {
        Some(user) => user.clone(),
        None => read_line("User: ")?,
    };
    let key = rpassword::prompt_password(match source.protocol {
        AuthProtocol::Token => "Key: ",
        AuthProtocol::Keystone => "Password: ",
    })?;

    build_credentials(source.protocol, &auth_url, &user, &key, tenant.as_deref())
}

fn read_line(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        bail!("end of input");
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_token_credentials() {
        let credentials = build_credentials(
            AuthProtocol::Token,
            "http://127.0.0.1:8080/auth/v1.0",
            " test:tester ",
            "testing",
            None,
        )
        .unwrap();
        match credentials {
            Credentials::Token(token) => {
                assert_eq!(token.auth_user, "test:tester");
                assert_eq!(token.auth_key, "testing");
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
    }

    #[test]
    fn test_build_keystone_credentials_splits_tenant() {
        let credentials = build_credentials(
            AuthProtocol::Keystone,
            "http://127.0.0.1:8080/v2.0/tokens",
            "test:tester",
            "testing",
            None,
        )
        .unwrap();
        match credentials {
            Credentials::Keystone(keystone) => {
                assert_eq!(keystone.tenant, "test");
                assert_eq!(keystone.username, "tester");
            }
            other => panic!("unexpected credentials: {other:?}"),
        }

        let explicit = build_credentials(
            AuthProtocol::Keystone,
            "http://127.0.0.1:8080/v2.0/tokens",
            "tester",
            "testing",
            Some("other"),
        )
        .unwrap();
        assert!(matches!(explicit, Credentials::Keystone(ref k) if k.tenant == "other"));
    }

    #[test]
    fn test_build_credentials_rejects_bad_input() {
        assert!(build_credentials(AuthProtocol::Token, "not a url", "u", "k", None).is_err());
        assert!(build_credentials(AuthProtocol::Token, "http://h/auth", "", "k", None).is_err());
        assert!(build_credentials(AuthProtocol::Token, "http://h/auth", "u", "", None).is_err());
    }

    #[test]
    fn test_preset_requires_user_and_key() {
        let form = LoginForm {
            auth_url: "http://127.0.0.1:8080/auth/v1.0".to_string(),
            pending_requests: 1,
        };
        let mut source = CredentialSource {
            user: Some("test:tester".to_string()),
            ..CredentialSource::default()
        };
        assert!(source.preset(&form).is_none());

        source.key = Some("testing".to_string());
        let credentials = source.preset(&form).unwrap().unwrap();
        assert_eq!(credentials.auth_url().path(), "/auth/v1.0");
    }
}
