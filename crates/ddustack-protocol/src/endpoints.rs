//! Fixed API paths the session core depends on.
//!
//! Paths are relative to the configured base URL and keep the trailing
//! slash the API's router expects.

use crate::OAuthProvider;

/// Trades the ambient refresh cookie for a new access token.
pub const REFRESH: &str = "/auth/refresh/";
/// Current user's profile (`GET`) and partial update (`PUT`).
pub const ME: &str = "/users/me/";
/// Profile picture upload, a `multipart/form-data` `POST`.
pub const AVATAR: &str = "/users/me/avatar/";
/// Form field the avatar upload reads the file from.
pub const AVATAR_FIELD: &str = "avatar";
pub const LOGIN: &str = "/auth/login/";
pub const REGISTER: &str = "/auth/register/";
pub const LOGOUT: &str = "/auth/logout/";
pub const CHECK_EMAIL: &str = "/auth/check-email/";

/// Code exchange path for an OAuth provider, e.g. `/auth/oauth/github/`.
pub fn oauth_exchange(provider: OAuthProvider) -> String {
    format!("/auth/oauth/{provider}/")
}
