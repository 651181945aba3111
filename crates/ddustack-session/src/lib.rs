//! Session gatekeeper for the DDUSTACK client.
//!
//! Owns the only piece of shared mutable state in the client (who is
//! signed in, with which access token) and every path that changes it:
//!
//! - [`Gatekeeper::bootstrap`]: recover a session from the refresh cookie at startup
//! - [`Gatekeeper::request_with_reauth`]: attach the token, refresh once on 401, replay once
//! - [`Gatekeeper::login`] / [`Gatekeeper::register`] / [`Gatekeeper::logout`]
//! - [`Gatekeeper::complete_oauth`]: finish an OAuth redirect within a deadline
//!
//! Views read [`Session`] snapshots and decide what to render with
//! [`Access::evaluate`].
//!
//! # Refresh single-flight
//!
//! However many requests see a 401 for the same expired token, exactly one
//! `POST /auth/refresh/` is sent. See [`RefreshGuard`].

mod access;
mod auto_logout;
pub mod claims;
mod error;
mod gatekeeper;
mod guard;
mod oauth;
mod session;

pub use access::Access;
pub use auto_logout::{AutoLogout, DEFAULT_AUTO_LOGOUT};
pub use error::SessionError;
pub use gatekeeper::Gatekeeper;
pub use guard::{GuardState, RefreshGuard, RefreshTicket};
pub use oauth::{AuthorizationRequest, OAuthCallback, OAuthClientConfig};
pub use session::{BootstrapOutcome, GatekeeperConfig, Session, SessionStore};
