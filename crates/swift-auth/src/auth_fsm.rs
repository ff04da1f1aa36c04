//! Authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌──────────────────┐  AuthRequested   ┌──────────────────┐
//! │ Unauthenticated  │ ───────────────► │   AuthPending    │ ◄─┐ AuthRequested
//! │    (initial)     │ ◄─────────────── │  (prompt open)   │ ──┘
//! └──────┬───────────┘  PromptAbandoned └────────┬─────────┘
//!        │ ▲                                     │ LoginStarted
//!        │ │ LoginFailed                         ▼
//!        │ │                           ┌──────────────────┐
//!        │ └────────────────────────── │  Authenticating  │ ◄─┐ AuthRequested
//!        │        LoginStarted ──────► │ (protocol runs)  │ ──┘
//!        │                             └────────┬─────────┘
//!        │                                      │ LoginSucceeded
//!        │ LoggedOut                            ▼
//!        │                             ┌──────────────────┐
//!        └──────────────────────────── │  Authenticated   │
//!                                      └──────────────────┘
//!                                        AuthRequested → AuthPending
//!                                        LoginStarted  → Authenticating
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(Unauthenticated)

    Unauthenticated => {
        AuthRequested => AuthPending,
        LoginStarted => Authenticating
    },
    AuthPending => {
        // Another request joins the wave already waiting on the prompt
        AuthRequested => AuthPending,
        LoginStarted => Authenticating,
        PromptAbandoned => Unauthenticated
    },
    Authenticating => {
        // Request parked while a login is in flight
        AuthRequested => Authenticating,
        LoginSucceeded => Authenticated,
        LoginFailed => Unauthenticated
    },
    Authenticated => {
        // A request was rejected (token expired or revoked)
        AuthRequested => AuthPending,
        LoginStarted => Authenticating,
        LoggedOut => Unauthenticated
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Public view of the FSM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No session and nothing waiting.
    Unauthenticated,
    /// Requests are parked and the login prompt is open.
    AuthPending,
    /// A login protocol is running.
    Authenticating,
    /// Bearer headers and a storage endpoint are available.
    Authenticated,
}

impl AuthState {
    /// Returns true if storage calls can be sent directly.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }

    /// Returns true while requests may be parked in the queue.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthState::AuthPending | AuthState::Authenticating)
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::Unauthenticated => AuthState::Unauthenticated,
            AuthMachineState::AuthPending => AuthState::AuthPending,
            AuthMachineState::Authenticating => AuthState::Authenticating,
            AuthMachineState::Authenticated => AuthState::Authenticated,
        }
    }
}

/// Payload for auth state change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    /// Current auth state.
    pub state: AuthState,
    /// Number of requests parked in the queue.
    pub pending_requests: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unauthenticated() {
        let machine = AuthMachine::new();
        assert_eq!(*machine.state(), AuthMachineState::Unauthenticated);
    }

    #[test]
    fn test_prompted_login_flow() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::AuthRequested).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::AuthPending);

        machine.consume(&AuthMachineInput::LoginStarted).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Authenticating);

        machine.consume(&AuthMachineInput::LoginSucceeded).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Authenticated);
    }

    #[test]
    fn test_repeated_auth_requests_stay_pending() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::AuthRequested).unwrap();
        machine.consume(&AuthMachineInput::AuthRequested).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::AuthPending);
    }

    #[test]
    fn test_auth_request_during_login_stays_authenticating() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::LoginStarted).unwrap();
        machine.consume(&AuthMachineInput::AuthRequested).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Authenticating);
    }

    #[test]
    fn test_login_failure_returns_to_unauthenticated() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::AuthRequested).unwrap();
        machine.consume(&AuthMachineInput::LoginStarted).unwrap();
        machine.consume(&AuthMachineInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Unauthenticated);
    }

    #[test]
    fn test_rejected_request_loops_back_to_pending() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::LoginStarted).unwrap();
        machine.consume(&AuthMachineInput::LoginSucceeded).unwrap();
        machine.consume(&AuthMachineInput::AuthRequested).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::AuthPending);
    }

    #[test]
    fn test_prompt_abandoned() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::AuthRequested).unwrap();
        machine.consume(&AuthMachineInput::PromptAbandoned).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Unauthenticated);
    }

    #[test]
    fn test_second_login_cannot_start_while_authenticating() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::LoginStarted).unwrap();
        assert!(machine.consume(&AuthMachineInput::LoginStarted).is_err());
        assert_eq!(*machine.state(), AuthMachineState::Authenticating);
    }

    #[test]
    fn test_invalid_transitions_return_error() {
        let mut machine = AuthMachine::new();

        assert!(machine.consume(&AuthMachineInput::LoginSucceeded).is_err());
        assert!(machine.consume(&AuthMachineInput::LoggedOut).is_err());
        assert!(machine.consume(&AuthMachineInput::PromptAbandoned).is_err());
    }

    #[test]
    fn test_logout() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::LoginStarted).unwrap();
        machine.consume(&AuthMachineInput::LoginSucceeded).unwrap();
        machine.consume(&AuthMachineInput::LoggedOut).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Unauthenticated);
    }

    #[test]
    fn test_auth_state_flags() {
        assert!(AuthState::Authenticated.is_authenticated());
        assert!(!AuthState::AuthPending.is_authenticated());
        assert!(AuthState::AuthPending.is_transient());
        assert!(AuthState::Authenticating.is_transient());
        assert!(!AuthState::Unauthenticated.is_transient());
        assert!(!AuthState::Authenticated.is_transient());
    }

    #[test]
    fn test_auth_state_serializes_snake_case() {
        let json = serde_json::to_string(&AuthState::AuthPending).unwrap();
        assert_eq!(json, "\"auth_pending\"");
    }
}
