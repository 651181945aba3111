//! Error types for the session layer.

use std::time::Duration;

use ddustack_protocol::ProtocolError;
use ddustack_transport::TransportError;

/// Errors that can occur during session management.
///
/// Token expiry is *not* in this list: the gatekeeper absorbs it with one
/// refresh and one replay. What reaches callers is either a real rejection
/// or a failure that was never about the token.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Credentials, refresh cookie, or OAuth code were rejected.
    /// Carries the API's `detail` message when it sent one.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The request was still unauthorized after the one allowed
    /// refresh-and-replay.
    #[error("unauthorized")]
    Unauthorized,

    /// The API answered with a non-success status other than 401.
    #[error("api error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    /// The request never got an answer (connect failure, timeout, ...).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded or the API's JSON had the wrong shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The OAuth callback was malformed or the code exchange failed.
    #[error("oauth login failed: {0}")]
    OAuth(String),

    /// The OAuth exchange did not finish within the client-side deadline.
    #[error("oauth login timed out after {0:?}")]
    OAuthTimeout(Duration),

    /// The operation needs a signed-in user and there is none.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl SessionError {
    /// `true` for failures that end the session rather than a single call.
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self,
            SessionError::AuthFailed(_) | SessionError::Unauthorized | SessionError::NotAuthenticated
        )
    }
}
