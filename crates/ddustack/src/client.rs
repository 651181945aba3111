//! `PortalClient` builder: the HTTP transport and gatekeeper wired together.

use std::sync::Arc;
use std::time::Duration;

use ddustack_session::{
    AuthorizationRequest, AutoLogout, BootstrapOutcome, Gatekeeper, OAuthCallback, Session,
    SessionError,
};
use ddustack_protocol::UserProfile;
use ddustack_transport::HttpTransport;
use url::Url;

use crate::{ClientConfig, DdustackError};

/// Builder for a [`PortalClient`].
///
/// # Example
///
/// ```rust,ignore
/// use ddustack::prelude::*;
///
/// let client = PortalClient::builder()
///     .base_url("https://portal.ddu.edu.et/api")
///     .build()?;
/// client.bootstrap().await;
/// ```
pub struct PortalClientBuilder {
    config: ClientConfig,
}

impl PortalClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Replaces every setting at once, e.g. with [`ClientConfig::from_env`].
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.base_url = url.to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn oauth_timeout(mut self, timeout: Duration) -> Self {
        self.config.oauth_timeout = timeout;
        self
    }

    /// Builds the HTTP transport and an empty, initializing session.
    pub fn build(self) -> Result<PortalClient, DdustackError> {
        let config = self.config.validated();
        let transport = HttpTransport::new(&config.base_url, config.request_timeout)?;
        let gatekeeper = Arc::new(Gatekeeper::new(transport, config.gatekeeper_config()));

        tracing::info!(base_url = %config.base_url, "portal client ready");
        Ok(PortalClient { gatekeeper, config })
    }
}

impl Default for PortalClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A client for one user's session against the portal API.
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct PortalClient {
    gatekeeper: Arc<Gatekeeper<HttpTransport>>,
    config: ClientConfig,
}

impl PortalClient {
    pub fn builder() -> PortalClientBuilder {
        PortalClientBuilder::new()
    }

    /// The gatekeeper every authorized call goes through.
    pub fn gatekeeper(&self) -> &Arc<Gatekeeper<HttpTransport>> {
        &self.gatekeeper
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> Session {
        self.gatekeeper.session()
    }

    /// Recovers a session from the refresh cookie. See [`Gatekeeper::bootstrap`].
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        self.gatekeeper.bootstrap().await
    }

    /// The GitHub sign-in URL, if GitHub is configured.
    pub fn github_authorization(&self) -> Result<AuthorizationRequest, DdustackError> {
        let github = self.config.github_oauth().ok_or_else(|| {
            DdustackError::Config(
                "GitHub sign-in needs DDUSTACK_GITHUB_CLIENT_ID and DDUSTACK_GITHUB_REDIRECT_URI".into(),
            )
        })?;
        Ok(github.authorization_request()?)
    }

    /// Finishes an OAuth redirect from the URL the provider sent the user
    /// back to. `expected_state` is the state issued with the authorize URL,
    /// when the caller kept it.
    pub async fn complete_oauth_redirect(
        &self,
        callback_url: &str,
        expected_state: Option<&str>,
    ) -> Result<UserProfile, DdustackError> {
        let url = Url::parse(callback_url)
            .map_err(|e| SessionError::OAuth(format!("malformed callback url {callback_url:?}: {e}")))?;
        let callback = OAuthCallback::from_url(&url)?;
        if let Some(expected) = expected_state {
            callback.verify_state(expected)?;
        }
        Ok(self.gatekeeper.complete_oauth_callback(&callback).await?)
    }

    /// Starts the configured auto-logout countdown.
    pub fn arm_auto_logout(&self) -> AutoLogout {
        AutoLogout::spawn(Arc::clone(&self.gatekeeper), self.config.auto_logout)
    }
}
