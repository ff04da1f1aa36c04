//! Seam to the login prompt.

/// Fresh form state handed to the prompt each time it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Auth endpoint to pre-fill.
    pub auth_url: String,
    /// Requests waiting on this login.
    pub pending_requests: usize,
}

/// Collects credentials from the user.
///
/// `open` is called at most once per pending wave and must not block. The
/// prompt answers later by calling `AuthCoordinator::authenticate` (possibly
/// several times, if logins fail) or `AuthCoordinator::abandon`.
pub trait LoginPrompt: Send + Sync {
    fn open(&self, form: LoginForm);
}
