//! The session gatekeeper: every protected request goes through here.
//!
//! It is responsible for:
//! - Recovering a session at startup from the refresh cookie ([`Gatekeeper::bootstrap`])
//! - Attaching the bearer token ([`Gatekeeper::authorize`])
//! - Recovering from token expiry with exactly one refresh exchange per
//!   expiry, however many requests hit the 401 ([`Gatekeeper::request_with_reauth`])
//! - Credential login, registration, logout, and profile calls
//!
//! # Retry flow
//!
//! ```text
//! wait_idle ─→ send(token) ─→ 401? ──no──→ return response
//!                               │
//!                    sent without a token? ──yes──→ return 401
//!                               │ no
//!                    token rotated meanwhile? ──yes──→ replay once
//!                    session cleared meanwhile? ──yes──→ return 401
//!                    no signed-in user? ──yes──→ return 401
//!                               │ no
//!                    try_acquire ──leader──→ refresh ──ok──→ replay once
//!                               │                 └─fail─→ clear session, return 401
//!                               └─follower─→ wait_idle ─→ replay once (401 if cleared)
//! ```
//!
//! There is never a second replay: whatever the replay returns is final.

use std::time::SystemTime;

use ddustack_protocol::{
    ApiErrorBody, AuthResponse, AvatarResponse, Codec, Credentials, EmailCheck, EmailCheckResponse,
    FilePart, JsonCodec, RegisterRequest, TokenResponse, UserProfile, endpoints,
};
use rand::Rng;
use ddustack_transport::{ApiRequest, ApiResponse, ApiTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::claims;
use crate::guard::{GuardState, RefreshGuard};
use crate::{BootstrapOutcome, GatekeeperConfig, Session, SessionError, SessionStore};

/// Owns the session and mediates every call to the protected API.
///
/// Share it with `Arc`; every method takes `&self`. Independent instances
/// never share state, so tests can build one per case.
pub struct Gatekeeper<T: ApiTransport> {
    pub(crate) transport: T,
    pub(crate) store: SessionStore,
    guard: RefreshGuard,
    pub(crate) codec: JsonCodec,
    pub(crate) config: GatekeeperConfig,
}

impl<T: ApiTransport> Gatekeeper<T> {
    /// Creates a gatekeeper with an empty, initializing session.
    pub fn new(transport: T, config: GatekeeperConfig) -> Self {
        Self {
            transport,
            store: SessionStore::new(),
            guard: RefreshGuard::new(),
            codec: JsonCodec,
            config,
        }
    }

    // -- Read side --------------------------------------------------------

    /// A consistent copy of the current session.
    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    /// Receives every change to the session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    /// Whether a refresh exchange is in flight right now.
    pub fn refresh_state(&self) -> GuardState {
        self.guard.state()
    }

    /// The tunables this gatekeeper was built with.
    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// The transport every request goes out on. Calls made on it directly
    /// skip token handling.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -- Startup ----------------------------------------------------------

    /// Recovers a session from the ambient refresh cookie.
    ///
    /// Runs once per process (and again after [`reinitialize`](Self::reinitialize)).
    /// Every failure leaves an empty session; none is returned as an error.
    /// `is_initializing` is cleared when this settles, whatever the outcome.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        let current = self.store.snapshot();
        if !current.is_initializing {
            tracing::debug!("bootstrap already settled, skipping");
            return match current.user {
                Some(user) if current.access_token.is_some() => BootstrapOutcome::Authenticated(user),
                _ => BootstrapOutcome::Anonymous,
            };
        }

        let outcome = match self.recover_session().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "session recovered");
                BootstrapOutcome::Authenticated(user)
            }
            Err(SessionError::Transport(e)) => {
                tracing::warn!(error = %e, "session recovery failed, API unreachable");
                self.store.clear();
                BootstrapOutcome::Anonymous
            }
            Err(e) => {
                tracing::info!(reason = %e, "no session to recover");
                self.store.clear();
                BootstrapOutcome::Anonymous
            }
        };

        self.store.finish_initializing();
        outcome
    }

    /// Clears the session and re-enters the initializing state, so the next
    /// [`bootstrap`](Self::bootstrap) runs again.
    pub fn reinitialize(&self) {
        self.store.restart_initializing();
        tracing::info!("session reset, awaiting bootstrap");
    }

    async fn recover_session(&self) -> Result<UserProfile, SessionError> {
        let token = match self.guard.try_acquire() {
            Some(_ticket) => self.exchange_refresh_token().await?,
            None => {
                self.guard.wait_idle().await;
                self.store.access_token().ok_or(SessionError::NotAuthenticated)?
            }
        };

        let user = self.fetch_profile_with(token).await?;
        self.store.set_user(user.clone());
        Ok(user)
    }

    // -- Request path -----------------------------------------------------

    /// Returns `request` with the current bearer token attached.
    ///
    /// Waits out a refresh in flight first, so a token that is about to be
    /// replaced is never attached. With `proactive_refresh`, a JWT that has
    /// already expired is refreshed before it is used.
    pub async fn authorize(&self, request: &ApiRequest) -> ApiRequest {
        self.prepare(request).await.0
    }

    /// Like `authorize`, also reporting whether a refresh already ran for
    /// this request. A request gets at most one refresh.
    async fn prepare(&self, request: &ApiRequest) -> (ApiRequest, bool) {
        self.guard.wait_idle().await;
        let token = self.store.access_token();

        if self.config.proactive_refresh {
            let expired = self.store.user().is_some()
                && token.as_deref().is_some_and(|t| {
                    claims::expires_within(t, SystemTime::now(), self.config.expiry_leeway)
                });
            if expired {
                tracing::debug!("access token expired locally, refreshing before send");
                let token = self.refresh_or_join().await;
                return (request.with_bearer(token), true);
            }
        }

        (request.with_bearer(token), false)
    }

    /// Sends `request` with the bearer token, recovering once from a 401.
    ///
    /// Any response, whatever its status, comes back as `Ok`. A 401 that
    /// survives the refresh-and-replay is returned as is. `Err` means the
    /// request never got an answer; such failures don't touch the session.
    pub async fn request_with_reauth(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let (authorized, refreshed) = self.prepare(&request).await;
        let sent_with = authorized.bearer.clone();
        let response = self.transport.execute(authorized).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }
        if refreshed {
            tracing::debug!(path = %request.path, "unauthorized right after refresh");
            return Ok(response);
        }

        let Some(sent_with) = sent_with else {
            tracing::debug!(path = %request.path, "unauthorized without a token, not refreshing");
            return Ok(response);
        };
        if let Some(outcome) = self.settled_elsewhere(&request, &sent_with, &response).await {
            return outcome;
        }
        if self.store.user().is_none() {
            tracing::debug!(path = %request.path, "no signed-in user, not refreshing");
            return Ok(response);
        }

        match self.guard.try_acquire() {
            Some(_ticket) => {
                // A leader may have finished between our check and the ticket.
                if let Some(outcome) = self.settled_elsewhere(&request, &sent_with, &response).await {
                    return outcome;
                }
                match self.exchange_refresh_token().await {
                    Ok(token) => {
                        tracing::debug!(path = %request.path, "refreshed, replaying");
                        self.replay(&request, Some(token)).await
                    }
                    Err(e) => {
                        self.terminate(&e);
                        Ok(response)
                    }
                }
            }
            None => {
                tracing::debug!(path = %request.path, "joining refresh in flight");
                self.guard.wait_idle().await;
                match self.store.access_token() {
                    Some(token) => self.replay(&request, Some(token)).await,
                    None => Ok(response),
                }
            }
        }
    }

    /// The session no longer holds the token this request was sent with:
    /// another caller rotated it (replay once with the new one) or the
    /// session was cleared (keep the 401). `None` when it still holds it.
    async fn settled_elsewhere(
        &self,
        request: &ApiRequest,
        sent_with: &str,
        response: &ApiResponse,
    ) -> Option<Result<ApiResponse, SessionError>> {
        match self.store.access_token() {
            Some(current) if current == sent_with => None,
            Some(current) => {
                tracing::debug!(path = %request.path, "token rotated concurrently, replaying");
                Some(self.replay(request, Some(current)).await)
            }
            None => {
                tracing::debug!(path = %request.path, "session cleared meanwhile, keeping 401");
                Some(Ok(response.clone()))
            }
        }
    }

    /// Sends a protected request and decodes a JSON success body.
    ///
    /// Maps a final 401 to [`SessionError::Unauthorized`] and other
    /// non-success statuses to [`SessionError::Api`].
    pub async fn send_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, SessionError> {
        let response = self.request_with_reauth(request).await?;
        self.decode_success(&response)
    }

    /// Encodes `body` as the request's JSON body.
    pub fn with_json<B: Serialize>(&self, request: ApiRequest, body: &B) -> Result<ApiRequest, SessionError> {
        let bytes = self.codec.encode(body)?;
        Ok(request.body(self.codec.content_type(), bytes))
    }

    async fn replay(&self, request: &ApiRequest, token: Option<String>) -> Result<ApiResponse, SessionError> {
        let response = self.transport.execute(request.with_bearer(token)).await?;
        if response.is_unauthorized() {
            tracing::debug!(path = %request.path, "still unauthorized after replay");
        }
        Ok(response)
    }

    /// Leads a refresh if none is in flight, otherwise waits for it.
    /// Returns the token afterwards (`None` if the refresh failed).
    async fn refresh_or_join(&self) -> Option<String> {
        match self.guard.try_acquire() {
            Some(_ticket) => match self.exchange_refresh_token().await {
                Ok(token) => Some(token),
                Err(e) => {
                    self.terminate(&e);
                    None
                }
            },
            None => {
                self.guard.wait_idle().await;
                self.store.access_token()
            }
        }
    }

    /// One `POST /auth/refresh/`. Callers must hold the refresh ticket.
    ///
    /// A token that arrives after the session was cleared is dropped and
    /// reported as [`SessionError::NotAuthenticated`].
    async fn exchange_refresh_token(&self) -> Result<String, SessionError> {
        let generation = self.store.generation();
        tracing::debug!("refresh exchange started");
        let response = self
            .transport
            .execute(ApiRequest::post(endpoints::REFRESH))
            .await?;

        if !response.is_success() {
            return Err(SessionError::AuthFailed(self.detail_or_status(&response)));
        }

        let TokenResponse { access_token } = self.codec.decode(&response.body)?;
        if !self.store.set_access_token_if(generation, access_token.clone()) {
            tracing::debug!("session cleared during refresh, dropping token");
            return Err(SessionError::NotAuthenticated);
        }
        tracing::debug!("refresh exchange succeeded");
        Ok(access_token)
    }

    /// `GET /users/me/` with an explicit token, bypassing the retry path.
    pub(crate) async fn fetch_profile_with(&self, token: String) -> Result<UserProfile, SessionError> {
        let response = self
            .transport
            .execute(ApiRequest::get(endpoints::ME).with_bearer(Some(token)))
            .await?;
        self.decode_success(&response)
    }

    /// The refresh failed for good: log the user out.
    ///
    /// A refresh outlived by a sign-out leaves the session alone; it may
    /// already hold a newer login.
    fn terminate(&self, reason: &SessionError) {
        match reason {
            SessionError::NotAuthenticated => return,
            SessionError::Transport(e) => {
                tracing::warn!(error = %e, "refresh exchange unreachable, clearing session")
            }
            other => tracing::info!(reason = %other, "refresh rejected, clearing session"),
        }
        self.store.clear();
    }

    // -- Credential operations -------------------------------------------

    /// `POST /auth/login/`; stores the returned token and profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        let request = self.with_json(
            ApiRequest::post(endpoints::LOGIN),
            &Credentials {
                email: email.to_string(),
                password: password.to_string(),
            },
        )?;
        let auth: AuthResponse = self.exchange_credentials(request).await?;
        tracing::info!(user_id = %auth.user.id, "signed in with credentials");
        Ok(self.adopt(auth))
    }

    /// `POST /auth/register/`; signs the new account in.
    pub async fn register(&self, registration: &RegisterRequest) -> Result<UserProfile, SessionError> {
        let request = self.with_json(ApiRequest::post(endpoints::REGISTER), registration)?;
        let auth: AuthResponse = self.exchange_credentials(request).await?;
        tracing::info!(user_id = %auth.user.id, "registered and signed in");
        Ok(self.adopt(auth))
    }

    /// Revokes the refresh cookie server-side and clears the session.
    ///
    /// The local session is cleared even when the API call fails; the
    /// failure is still returned so the caller can report it.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let remote = self.request_with_reauth(ApiRequest::post(endpoints::LOGOUT)).await;
        self.store.clear();
        tracing::info!("signed out");

        match remote {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => {
                tracing::warn!(status = response.status, "server-side logout failed");
                Err(self.status_error(&response))
            }
            Err(e) => {
                tracing::warn!(error = %e, "server-side logout unreachable");
                Err(e)
            }
        }
    }

    /// Local-only logout.
    pub fn clear(&self) {
        self.store.clear();
        tracing::info!("session cleared");
    }

    /// Re-fetches `GET /users/me/` through the retry path and stores it.
    pub async fn refresh_profile(&self) -> Result<UserProfile, SessionError> {
        let user: UserProfile = self.send_json(ApiRequest::get(endpoints::ME)).await?;
        self.store.set_user(user.clone());
        Ok(user)
    }

    /// The stored profile, fetching it when only a token is present.
    pub async fn current_user(&self) -> Result<UserProfile, SessionError> {
        let session = self.store.snapshot();
        match (session.user, session.access_token) {
            (Some(user), _) => Ok(user),
            (None, Some(_)) => self.refresh_profile().await,
            (None, None) => Err(SessionError::NotAuthenticated),
        }
    }

    /// `PUT /users/me/` with a partial profile; stores the server's copy.
    pub async fn update_profile(&self, patch: &serde_json::Value) -> Result<UserProfile, SessionError> {
        if self.store.snapshot().is_anonymous() {
            return Err(SessionError::NotAuthenticated);
        }
        let request = self.with_json(ApiRequest::put(endpoints::ME), patch)?;
        let user: UserProfile = self.send_json(request).await?;
        self.store.set_user(user.clone());
        Ok(user)
    }

    /// `POST /users/me/avatar/` with the image as a form upload.
    ///
    /// Returns the URL the API stored it under and points the stored
    /// profile's `avatar` at it.
    pub async fn upload_avatar(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, SessionError> {
        if self.store.snapshot().is_anonymous() {
            return Err(SessionError::NotAuthenticated);
        }
        let part = FilePart::new(endpoints::AVATAR_FIELD, filename, content_type, bytes);
        let (form_type, body) = part.encode(&form_boundary());
        let request = ApiRequest::post(endpoints::AVATAR).body(form_type, body);

        let AvatarResponse { avatar } = self.send_json(request).await?;
        self.store.set_avatar(avatar.clone());
        tracing::debug!(%avatar, "avatar uploaded");
        Ok(avatar)
    }

    /// `POST /auth/check-email/`: whether an account exists for `email`.
    pub async fn check_email(&self, email: &str) -> Result<bool, SessionError> {
        let request = self.with_json(
            ApiRequest::post(endpoints::CHECK_EMAIL),
            &EmailCheck {
                email: email.to_string(),
            },
        )?;
        let response = self.transport.execute(request).await?;
        let EmailCheckResponse { exists } = self.decode_success(&response)?;
        Ok(exists)
    }

    /// Stores a login-style response and returns its profile.
    pub(crate) fn adopt(&self, auth: AuthResponse) -> UserProfile {
        self.store.set_credentials(auth.access_token, auth.user.clone());
        auth.user
    }

    /// Sends an unauthenticated credential exchange and decodes its body.
    /// 400/401 become `AuthFailed`.
    pub(crate) async fn exchange_credentials<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, SessionError> {
        let response = self.transport.execute(request).await?;
        match response.status {
            400 | 401 => Err(SessionError::AuthFailed(self.detail_or_status(&response))),
            _ => self.decode_success(&response),
        }
    }

    // -- Response helpers -------------------------------------------------

    fn decode_success<R: DeserializeOwned>(&self, response: &ApiResponse) -> Result<R, SessionError> {
        if response.is_success() {
            Ok(self.codec.decode(&response.body)?)
        } else {
            Err(self.status_error(response))
        }
    }

    fn status_error(&self, response: &ApiResponse) -> SessionError {
        if response.is_unauthorized() {
            SessionError::Unauthorized
        } else {
            SessionError::Api {
                status: response.status,
                detail: self.detail(response),
            }
        }
    }

    fn detail(&self, response: &ApiResponse) -> Option<String> {
        self.codec
            .decode::<ApiErrorBody>(&response.body)
            .ok()
            .and_then(|body| body.detail)
    }

    fn detail_or_status(&self, response: &ApiResponse) -> String {
        self.detail(response)
            .unwrap_or_else(|| format!("status {}", response.status))
    }
}

fn form_boundary() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("ddustack-{hex}")
}
