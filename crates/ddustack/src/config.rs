//! Client configuration, loaded from `DDUSTACK_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use ddustack_session::{DEFAULT_AUTO_LOGOUT, GatekeeperConfig, OAuthClientConfig};

use crate::DdustackError;

/// Everything needed to build a [`PortalClient`](crate::PortalClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root every endpoint path is appended to.
    /// Default: `http://localhost:8000/api`.
    pub base_url: String,
    /// Per-request timeout. Default: 30 seconds.
    pub request_timeout: Duration,
    /// Deadline for the OAuth exchange plus profile fetch. Default: 10 seconds.
    pub oauth_timeout: Duration,
    /// Refresh locally expired JWTs before sending. Default: `true`.
    pub proactive_refresh: bool,
    /// Countdown used by [`PortalClient::arm_auto_logout`](crate::PortalClient::arm_auto_logout).
    /// Default: 45 seconds.
    pub auto_logout: Duration,
    pub github_client_id: Option<String>,
    pub github_redirect_uri: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout: Duration::from_secs(30),
            oauth_timeout: Duration::from_secs(10),
            proactive_refresh: true,
            auto_logout: DEFAULT_AUTO_LOGOUT,
            github_client_id: None,
            github_redirect_uri: None,
        }
    }
}

impl ClientConfig {
    /// Upper bound for both timeouts.
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

    /// Loads `.env` if present, then reads the process environment.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, DdustackError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DdustackError> {
        let mut config = Self::default();

        if let Some(url) = lookup("DDUSTACK_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = parse::<u64>(&lookup, "DDUSTACK_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "DDUSTACK_OAUTH_TIMEOUT_SECS")? {
            config.oauth_timeout = Duration::from_secs(secs);
        }
        if let Some(enabled) = parse::<bool>(&lookup, "DDUSTACK_PROACTIVE_REFRESH")? {
            config.proactive_refresh = enabled;
        }
        if let Some(secs) = parse::<u64>(&lookup, "DDUSTACK_AUTO_LOGOUT_SECS")? {
            config.auto_logout = Duration::from_secs(secs);
        }
        config.github_client_id = lookup("DDUSTACK_GITHUB_CLIENT_ID").filter(|v| !v.is_empty());
        config.github_redirect_uri = lookup("DDUSTACK_GITHUB_REDIRECT_URI").filter(|v| !v.is_empty());

        Ok(config.validated())
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - Timeouts are kept within `1s..=MAX_TIMEOUT`.
    /// - A trailing `/` on `base_url` is dropped.
    pub fn validated(mut self) -> Self {
        for (name, timeout) in [
            ("request_timeout", &mut self.request_timeout),
            ("oauth_timeout", &mut self.oauth_timeout),
        ] {
            let clamped = (*timeout).clamp(Duration::from_secs(1), Self::MAX_TIMEOUT);
            if clamped != *timeout {
                tracing::warn!(setting = name, ?timeout, ?clamped, "timeout out of range, clamping");
                *timeout = clamped;
            }
        }
        let trimmed = self.base_url.trim_end_matches('/').len();
        self.base_url.truncate(trimmed);
        self
    }

    /// Settings handed to the gatekeeper.
    pub fn gatekeeper_config(&self) -> GatekeeperConfig {
        GatekeeperConfig {
            oauth_timeout: self.oauth_timeout,
            proactive_refresh: self.proactive_refresh,
            ..GatekeeperConfig::default()
        }
    }

    /// GitHub sign-in settings, when both the client ID and redirect URI are set.
    pub fn github_oauth(&self) -> Option<OAuthClientConfig> {
        match (&self.github_client_id, &self.github_redirect_uri) {
            (Some(id), Some(redirect)) => Some(OAuthClientConfig::github(id, redirect)),
            _ => None,
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, DdustackError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DdustackError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
