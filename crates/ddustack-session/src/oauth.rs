//! OAuth redirect flow: authorize URL out, callback in, code exchange.
//!
//! ```text
//!   authorization_request() ──→ provider login page
//!                                      │ redirect
//!   OAuthCallback::from_url() ←── /oauth/callback/{provider}?code=...&state=...
//!             │
//!   Gatekeeper::complete_oauth() ──→ POST /auth/oauth/{provider}/ ──→ GET /users/me/
//! ```
//!
//! The session only changes once both calls have succeeded. A timeout or
//! failure anywhere leaves it as it was.

use ddustack_protocol::{OAuthCodeExchange, OAuthProvider, TokenResponse, UserProfile, endpoints};
use ddustack_transport::{ApiRequest, ApiTransport};
use rand::Rng;
use url::Url;

use crate::{Gatekeeper, SessionError};

/// Client-side settings for one identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub provider: OAuthProvider,
    pub authorize_endpoint: String,
    pub client_id: String,
    /// Must point at the portal's `/oauth/callback/{provider}` route.
    pub redirect_uri: String,
    pub scope: String,
}

impl OAuthClientConfig {
    /// GitHub with the `read:user user:email` scope.
    pub fn github(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            provider: OAuthProvider::Github,
            authorize_endpoint: "https://github.com/login/oauth/authorize".into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: "read:user user:email".into(),
        }
    }

    pub fn google(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            provider: OAuthProvider::Google,
            authorize_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: "openid email profile".into(),
        }
    }

    /// Builds the provider URL to send the user to, with a fresh `state`.
    ///
    /// Keep the returned `state` until the callback arrives and check it
    /// with [`OAuthCallback::verify_state`].
    pub fn authorization_request(&self) -> Result<AuthorizationRequest, SessionError> {
        let mut url = Url::parse(&self.authorize_endpoint)
            .map_err(|e| SessionError::OAuth(format!("invalid authorize endpoint: {e}")))?;
        let state = generate_state();

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scope)
            .append_pair("state", &state);

        Ok(AuthorizationRequest { url, state })
    }
}

/// Where to send the user, and the anti-forgery value to expect back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// The parameters the provider redirected back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCallback {
    pub provider: OAuthProvider,
    pub code: String,
    pub state: Option<String>,
}

impl OAuthCallback {
    /// Parses a callback URL of the form
    /// `.../oauth/callback/{provider}?code=...[&state=...]`.
    pub fn from_url(url: &Url) -> Result<Self, SessionError> {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let provider = match segments.as_slice() {
            [.., "oauth", "callback", provider] => provider
                .parse::<OAuthProvider>()
                .map_err(|e| SessionError::OAuth(e.to_string()))?,
            _ => {
                return Err(SessionError::OAuth(format!(
                    "not an oauth callback route: {}",
                    url.path()
                )));
            }
        };

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(SessionError::OAuth(format!("provider returned error: {error}")));
        }
        let code = code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| SessionError::OAuth("callback is missing the code".into()))?;

        Ok(Self {
            provider,
            code,
            state,
        })
    }

    /// Checks the echoed `state` against the one issued with the request.
    pub fn verify_state(&self, expected: &str) -> Result<(), SessionError> {
        match self.state.as_deref() {
            Some(state) if state == expected => Ok(()),
            Some(_) => Err(SessionError::OAuth("state mismatch".into())),
            None => Err(SessionError::OAuth("callback is missing the state".into())),
        }
    }
}

impl<T: ApiTransport> Gatekeeper<T> {
    /// Exchanges an OAuth authorization code for a session.
    ///
    /// The exchange and the profile fetch together must finish within
    /// `oauth_timeout`. On success the token and profile are stored at once.
    pub async fn complete_oauth(
        &self,
        provider: OAuthProvider,
        code: &str,
    ) -> Result<UserProfile, SessionError> {
        let deadline = self.config.oauth_timeout;
        match tokio::time::timeout(deadline, self.exchange_oauth_code(provider, code)).await {
            Ok(Ok((token, user))) => {
                self.store.set_credentials(token, user.clone());
                tracing::info!(%provider, user_id = %user.id, "signed in with oauth");
                Ok(user)
            }
            Ok(Err(e)) => {
                tracing::warn!(%provider, error = %e, "oauth login failed");
                Err(SessionError::OAuth(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(%provider, ?deadline, "oauth login timed out");
                Err(SessionError::OAuthTimeout(deadline))
            }
        }
    }

    /// [`complete_oauth`](Self::complete_oauth) for a parsed callback.
    pub async fn complete_oauth_callback(
        &self,
        callback: &OAuthCallback,
    ) -> Result<UserProfile, SessionError> {
        self.complete_oauth(callback.provider, &callback.code).await
    }

    async fn exchange_oauth_code(
        &self,
        provider: OAuthProvider,
        code: &str,
    ) -> Result<(String, UserProfile), SessionError> {
        let request = self.with_json(
            ApiRequest::post(endpoints::oauth_exchange(provider)),
            &OAuthCodeExchange {
                code: code.to_string(),
            },
        )?;
        let TokenResponse { access_token } = self.exchange_credentials(request).await?;

        // Any user in the exchange body is ignored; the profile endpoint
        // is authoritative.
        let user = self.fetch_profile_with(access_token.clone()).await?;
        Ok((access_token, user))
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
