//! In-memory Swift-compatible proxy.
//!
//! `SwiftSimulator` implements `HttpTransport`, so it can stand in for the
//! network anywhere a transport is expected: in tests, and behind the CLI's
//! `--simulate` flag. It serves:
//! - one account with containers, objects, headers and pseudo-directory listings
//! - the token-header (`/auth/v1.0`) and Keystone (`/v2.0/tokens`) login endpoints
//! - token checks on every storage call, with revocation to simulate expiry
//! - fault injection for individual requests

mod account;
mod simulator;

pub use simulator::{
    FaultKind, SwiftSimulator, DEFAULT_ACCOUNT, DEFAULT_BASE_URL, KEYSTONE_AUTH_PATH,
    TOKEN_AUTH_PATH,
};
