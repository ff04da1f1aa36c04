//! Auth coordinator: one place that owns the session, the FSM and the queue
//! of requests waiting for a login.
//!
//! A storage call that has no usable session (or whose session was rejected)
//! is parked with [`AuthCoordinator::request_auth`]. The first park of a wave
//! opens the login prompt; later parks only join the queue. When the prompt
//! calls [`AuthCoordinator::authenticate`] and the login protocol succeeds,
//! every parked request is replayed once, oldest first, with the new bearer
//! headers merged in, and its caller receives the replay's response.

use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthState, AuthStateChangedPayload};
use crate::queue::{PendingEntry, PendingQueue};
use crate::{
    ActiveSession, AuthError, AuthResult, Credentials, KeystoneProtocol, LoginForm, LoginGrant,
    LoginPrompt, LoginProtocol, PendingReply, Session, StorageRequest, TokenHeaderProtocol,
};
use parking_lot::Mutex;
use std::sync::Arc;
use swift_transport::{Headers, HttpTransport};
use tracing::{debug, info, warn};

/// Callback invoked after every auth state change.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

/// How a storage call should proceed.
#[derive(Debug)]
pub enum Admission {
    /// A session is available; send the request with it.
    Ready {
        request: StorageRequest,
        session: ActiveSession,
    },
    /// The request was parked; its replayed response arrives on the reply.
    Parked(PendingReply),
}

struct CoordinatorState {
    fsm: AuthMachine,
    session: Session,
    queue: PendingQueue,
    prompt_open: bool,
    auth_url: String,
}

/// Owns the session and serializes logins.
pub struct AuthCoordinator {
    transport: Arc<dyn HttpTransport>,
    token_protocol: TokenHeaderProtocol,
    keystone_protocol: KeystoneProtocol,
    prompt: Arc<dyn LoginPrompt>,
    inner: Mutex<CoordinatorState>,
    state_callback: Mutex<Option<AuthStateCallback>>,
}

impl AuthCoordinator {
    /// Create a coordinator with no session.
    ///
    /// `default_auth_url` pre-fills the login form until a login has been
    /// attempted against some other endpoint.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        prompt: Arc<dyn LoginPrompt>,
        default_auth_url: impl Into<String>,
    ) -> Self {
        Self {
            token_protocol: TokenHeaderProtocol::new(transport.clone()),
            keystone_protocol: KeystoneProtocol::new(transport.clone()),
            transport,
            prompt,
            inner: Mutex::new(CoordinatorState {
                fsm: AuthMachine::new(),
                session: Session::new(),
                queue: PendingQueue::default(),
                prompt_open: false,
                auth_url: default_auth_url.into(),
            }),
            state_callback: Mutex::new(None),
        }
    }

    /// Set a callback to be notified of auth state changes.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    pub fn state(&self) -> AuthState {
        AuthState::from(self.inner.lock().fsm.state())
    }

    /// Number of requests waiting for a login.
    pub fn pending_requests(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// The current session, if the coordinator is authenticated.
    pub fn session(&self) -> Option<ActiveSession> {
        let inner = self.inner.lock();
        if AuthState::from(inner.fsm.state()).is_authenticated() {
            inner.session.snapshot()
        } else {
            None
        }
    }

    /// Park `request` until the next successful login.
    ///
    /// Any current session is dropped. The login prompt is opened if this is
    /// the first request of a wave; while a login is already running the
    /// request only joins the queue.
    pub fn request_auth(&self, request: StorageRequest) -> AuthResult<PendingReply> {
        let mut changes = Vec::new();
        let (reply, form) = {
            let mut inner = self.inner.lock();
            Self::park(&mut inner, request, &mut changes)?
        };
        self.finish(changes, form);
        Ok(reply)
    }

    /// Hand out the session for `request`, or park it if there is none.
    pub fn admit(&self, request: StorageRequest) -> AuthResult<Admission> {
        self.admit_unless(request, None)
    }

    /// Decide what to do with a request the server rejected with a 401.
    ///
    /// If a login finished since the request was sent (the current token
    /// differs from `rejected_token`), the request may be retried with the
    /// new session. Otherwise the session is dropped and the request parked.
    pub fn readmit(
        &self,
        request: StorageRequest,
        rejected_token: Option<&str>,
    ) -> AuthResult<Admission> {
        self.admit_unless(request, Some(rejected_token))
    }

    fn admit_unless(
        &self,
        request: StorageRequest,
        rejected_token: Option<Option<&str>>,
    ) -> AuthResult<Admission> {
        let mut changes = Vec::new();
        let (reply, form) = {
            let mut inner = self.inner.lock();
            if AuthState::from(inner.fsm.state()).is_authenticated() {
                if let Some(session) = inner.session.snapshot() {
                    let stale = matches!(rejected_token, Some(token) if token == session.token());
                    if !stale {
                        return Ok(Admission::Ready { request, session });
                    }
                }
            }
            Self::park(&mut inner, request, &mut changes)?
        };
        self.finish(changes, form);
        Ok(Admission::Parked(reply))
    }

    /// Run a login protocol and, on success, replay every parked request.
    ///
    /// Returns the new bearer headers. A failed login leaves parked requests
    /// in the queue and keeps the prompt open so it can be retried.
    pub async fn authenticate(&self, credentials: &Credentials) -> AuthResult<Headers> {
        let mut changes = Vec::new();
        {
            let mut inner = self.inner.lock();
            if AuthState::from(inner.fsm.state()) == AuthState::Authenticating {
                return Err(AuthError::LoginInProgress);
            }
            Self::apply(&mut inner, AuthMachineInput::LoginStarted, &mut changes)?;
            inner.session.clear();
            inner.auth_url = credentials.auth_url().to_string();
        }
        self.finish(changes, None);
        let guard = LoginGuard {
            coordinator: self,
            armed: true,
        };

        info!(
            protocol = credentials.protocol_name(),
            auth_url = %credentials.auth_url(),
            "Login started"
        );

        let result = match credentials {
            Credentials::Token(c) => self.token_protocol.login(c).await,
            Credentials::Keystone(c) => self.keystone_protocol.login(c).await,
        };

        match result {
            Ok(grant) => {
                let headers = self.complete_login(grant).await;
                guard.disarm();
                headers
            }
            Err(e) => {
                guard.disarm();
                self.fail_login()?;
                warn!(
                    protocol = credentials.protocol_name(),
                    error = %e,
                    "Login failed"
                );
                Err(e)
            }
        }
    }

    /// Dismiss the login prompt, rejecting every parked request.
    ///
    /// Returns how many requests were rejected.
    pub fn abandon(&self) -> AuthResult<usize> {
        let mut changes = Vec::new();
        let rejected = {
            let mut inner = self.inner.lock();
            match AuthState::from(inner.fsm.state()) {
                AuthState::Authenticating => return Err(AuthError::LoginInProgress),
                AuthState::AuthPending => {
                    Self::apply(&mut inner, AuthMachineInput::PromptAbandoned, &mut changes)?;
                    inner.prompt_open = false;
                    inner.queue.drain()
                }
                _ => {
                    inner.prompt_open = false;
                    Vec::new()
                }
            }
        };
        self.finish(changes, None);

        let count = rejected.len();
        for entry in rejected {
            entry.resolve(Err(AuthError::Abandoned));
        }
        if count > 0 {
            warn!(rejected = count, "Login prompt abandoned");
        }
        Ok(count)
    }

    /// Drop the session.
    ///
    /// With the prompt open this dismisses it like [`Self::abandon`], rejecting
    /// the parked requests. Refused with `LoginInProgress` during a login.
    pub fn logout(&self) -> AuthResult<()> {
        let mut changes = Vec::new();
        {
            let mut inner = self.inner.lock();
            let state = AuthState::from(inner.fsm.state());
            match state {
                AuthState::Unauthenticated => return Ok(()),
                AuthState::Authenticating => return Err(AuthError::LoginInProgress),
                AuthState::AuthPending => {
                    drop(inner);
                    self.abandon()?;
                    info!("Logged out");
                    return Ok(());
                }
                AuthState::Authenticated => {}
            }
            Self::apply(&mut inner, AuthMachineInput::LoggedOut, &mut changes)?;
            inner.session.clear();
        }
        self.finish(changes, None);
        info!("Logged out");
        Ok(())
    }

    async fn complete_login(&self, grant: LoginGrant) -> AuthResult<Headers> {
        let session = ActiveSession::from(grant.clone());
        let mut replayed = 0usize;
        let mut changes = Vec::new();

        // Requests parked while a batch is replaying land in the queue and
        // are picked up by the next pass; the session is only installed once
        // the queue is empty.
        loop {
            let batch: Vec<PendingEntry> = {
                let mut inner = self.inner.lock();
                if inner.queue.is_empty() {
                    Self::apply(&mut inner, AuthMachineInput::LoginSucceeded, &mut changes)?;
                    inner.session.establish(grant);
                    inner.prompt_open = false;
                    break;
                }
                inner.queue.drain()
            };

            for entry in batch {
                let request = entry
                    .request
                    .resolve(&session.storage_endpoint, &session.bearer_headers);
                debug!(method = %request.method, path = %request.url.path(), "Replaying parked request");
                let result = self.transport.send(request).await.map_err(AuthError::from);
                entry.resolve(result);
                replayed += 1;
            }
        }
        self.finish(changes, None);

        info!(
            storage_endpoint = %session.storage_endpoint,
            replayed,
            "Login succeeded"
        );
        Ok(session.bearer_headers)
    }

    fn fail_login(&self) -> AuthResult<()> {
        let mut changes = Vec::new();
        let form = {
            let mut inner = self.inner.lock();
            Self::apply(&mut inner, AuthMachineInput::LoginFailed, &mut changes)?;
            if inner.queue.is_empty() {
                None
            } else {
                Self::apply(&mut inner, AuthMachineInput::AuthRequested, &mut changes)?;
                Self::take_prompt(&mut inner)
            }
        };
        self.finish(changes, form);
        Ok(())
    }

    fn park(
        inner: &mut CoordinatorState,
        request: StorageRequest,
        changes: &mut Vec<AuthState>,
    ) -> AuthResult<(PendingReply, Option<LoginForm>)> {
        let new_state = Self::apply(inner, AuthMachineInput::AuthRequested, changes)?;
        inner.session.clear();
        debug!(
            target_path = %request.target.display_path(),
            method = %request.method,
            "Request parked until login"
        );
        let reply = inner.queue.push(request);
        let form = if new_state == AuthState::AuthPending {
            Self::take_prompt(inner)
        } else {
            None
        };
        Ok((reply, form))
    }

    /// Claim the prompt for the current wave, if nobody has yet.
    fn take_prompt(inner: &mut CoordinatorState) -> Option<LoginForm> {
        if inner.prompt_open {
            return None;
        }
        inner.prompt_open = true;
        Some(LoginForm {
            auth_url: inner.auth_url.clone(),
            pending_requests: inner.queue.len(),
        })
    }

    fn apply(
        inner: &mut CoordinatorState,
        input: AuthMachineInput,
        changes: &mut Vec<AuthState>,
    ) -> AuthResult<AuthState> {
        let old_state = AuthState::from(inner.fsm.state());

        inner.fsm.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                inner.fsm.state()
            ))
        })?;

        let new_state = AuthState::from(inner.fsm.state());
        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Auth state transition"
            );
            changes.push(new_state);
        }
        Ok(new_state)
    }

    /// Notify and open the prompt once the state lock is released.
    fn finish(&self, changes: Vec<AuthState>, form: Option<LoginForm>) {
        for state in changes {
            self.notify_state_change(state);
        }
        if let Some(form) = form {
            info!(
                pending_requests = form.pending_requests,
                "Opening login prompt"
            );
            self.prompt.open(form);
        }
    }

    fn notify_state_change(&self, state: AuthState) {
        let pending_requests = self.pending_requests();
        let cb = self.state_callback.lock();
        if let Some(ref callback) = *cb {
            callback(AuthStateChangedPayload {
                state,
                pending_requests,
            });
        }
    }
}

/// Fails the login in progress if `authenticate` is dropped before it
/// finishes, so the coordinator never stays in `Authenticating`.
struct LoginGuard<'a> {
    coordinator: &'a AuthCoordinator,
    armed: bool,
}

impl LoginGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Login cancelled before it finished");
        if let Err(e) = self.coordinator.fail_login() {
            warn!(error = %e, "Failed to reset auth state after cancelled login");
        }
    }
}
