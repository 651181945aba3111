//! Route-guard decisions over a session snapshot.

use ddustack_protocol::Role;

use crate::Session;

/// What a protected view should do with the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Startup recovery or the profile fetch hasn't settled; show a loader.
    Pending,
    /// Nobody is signed in; go to the login entry point.
    RedirectToLogin,
    /// Signed in, but the role is not allowed here.
    Forbidden,
    /// Render the view.
    Granted,
}

impl Access {
    /// Decides access for a view that admits `allowed_roles`.
    /// An empty slice admits any signed-in role.
    pub fn evaluate(session: &Session, allowed_roles: &[Role]) -> Self {
        if session.is_initializing {
            return Access::Pending;
        }
        match (&session.access_token, &session.user) {
            (None, None) => Access::RedirectToLogin,
            // Token without a profile: the profile fetch is still running.
            (_, None) => Access::Pending,
            (_, Some(user)) => {
                if allowed_roles.is_empty() || user.has_any_role(allowed_roles) {
                    Access::Granted
                } else {
                    Access::Forbidden
                }
            }
        }
    }
}
