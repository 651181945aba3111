//! # DDUSTACK
//!
//! Client for the DDUSTACK university portal API.
//!
//! All authorized calls go through one [`Gatekeeper`](prelude::Gatekeeper)
//! that owns the session: it recovers it from the refresh cookie at
//! startup, attaches the bearer token, and absorbs token expiry with a
//! single shared refresh.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddustack::prelude::*;
//!
//! # async fn run() -> Result<(), DdustackError> {
//! let client = PortalClient::builder()
//!     .config(ClientConfig::from_env()?)
//!     .build()?;
//!
//! if let BootstrapOutcome::Anonymous = client.bootstrap().await {
//!     client.gatekeeper().login("abebe@ddu.edu.et", "secret").await?;
//! }
//! let courses = client
//!     .gatekeeper()
//!     .request_with_reauth(ApiRequest::get("/courses/"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod telemetry;

pub use client::{PortalClient, PortalClientBuilder};
pub use config::ClientConfig;
pub use error::DdustackError;

pub use ddustack_protocol as protocol;
pub use ddustack_session as session;
pub use ddustack_transport as transport;

pub mod prelude {
    pub use crate::telemetry::init_tracing;
    pub use crate::{ClientConfig, DdustackError, PortalClient, PortalClientBuilder};

    pub use ddustack_protocol::{OAuthProvider, RegisterRequest, Role, UserId, UserProfile};
    pub use ddustack_session::{
        Access, AutoLogout, BootstrapOutcome, Gatekeeper, GatekeeperConfig, GuardState,
        OAuthCallback, OAuthClientConfig, Session, SessionError,
    };
    pub use ddustack_transport::{ApiRequest, ApiResponse, ApiTransport, Method, TransportError};
}
