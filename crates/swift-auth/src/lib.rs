//! Authentication for the Swift browser.
//!
//! This crate provides:
//! - The in-memory `Session` (bearer headers + storage endpoint)
//! - An explicit FSM-based auth state (rust-fsm)
//! - The pending request queue that parks storage calls until a login succeeds
//! - `AuthCoordinator`, which opens the login prompt, runs a login protocol,
//!   and replays parked requests with fresh headers
//! - The token-header and Keystone login protocols

mod auth_fsm;
mod coordinator;
mod credentials;
mod error;
mod prompt;
mod protocol;
mod queue;
mod request;
mod session;

pub use auth_fsm::auth_machine;
pub use auth_fsm::{AuthMachine, AuthMachineInput, AuthMachineState, AuthState, AuthStateChangedPayload};
pub use coordinator::{Admission, AuthCoordinator, AuthStateCallback};
pub use credentials::{Credentials, KeystoneCredentials, LoginGrant, TokenCredentials};
pub use error::{AuthError, AuthResult};
pub use prompt::{LoginForm, LoginPrompt};
pub use protocol::{
    KeystoneProtocol, LoginProtocol, TokenHeaderProtocol, AUTH_KEY_HEADER, AUTH_TOKEN_HEADER,
    AUTH_USER_HEADER, STORAGE_SERVICE_NAME, STORAGE_URL_HEADER,
};
pub use queue::PendingReply;
pub use request::{StorageRequest, Target};
pub use session::{ActiveSession, Session};

#[cfg(test)]
mod tests;
