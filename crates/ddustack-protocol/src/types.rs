//! Payload types for the DDUSTACK REST API.
//!
//! Every type here is a JSON body that the API sends or accepts. Field
//! names follow the API's serializers exactly (snake_case), so most structs
//! need no serde renames at all.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A user's primary key (a UUID string on the server).
///
/// `#[serde(transparent)]` keeps it a bare string in JSON, so
/// `UserId("7f0c…")` is just `"7f0c…"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The portal role of an account.
///
/// The API sends these uppercase (`"STUDENT"`, `"ADMIN"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Admin,
    Moderator,
    Lecturer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
            Role::Moderator => "MODERATOR",
            Role::Lecturer => "LECTURER",
        };
        f.write_str(name)
    }
}

/// The identity record returned by `GET /users/me/`.
///
/// The session core only cares whether a profile is present; the
/// remaining fields are carried for the views that render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Free-form JSON the API attaches to the account.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// OAuth provider that created the account, if any.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    pub role: Role,
    /// University-issued student/staff number.
    pub user_id: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    /// Department primary key.
    pub department: Option<String>,
    /// Academic year.
    pub year: Option<u8>,
    pub semester: Option<u8>,
    #[serde(default)]
    pub date_joined: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl UserProfile {
    /// `"First Last"`, trimmed when either half is empty.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Returns `true` if the account's role is one of `roles`.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

// ---------------------------------------------------------------------------
// Auth payloads
// ---------------------------------------------------------------------------

/// Body of a successful `POST /auth/refresh/`.
///
/// The admin build of the portal read this field as `access`, so the
/// decoder accepts either name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "access")]
    pub access_token: String,
}

/// Body returned by login, registration, and the OAuth exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserProfile,
}

/// Body of `POST /auth/login/`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// Hand-written so passwords never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register/`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Body of `POST /auth/oauth/{provider}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCodeExchange {
    pub code: String,
}

/// Body of `POST /auth/check-email/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCheck {
    pub email: String,
}

/// Response of `POST /auth/check-email/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCheckResponse {
    pub exists: bool,
}

/// Response of `POST /users/me/avatar/`: where the stored image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

/// The API's error body: `{"detail": "..."}`.
///
/// Validation errors come back as field maps instead, so `detail` is
/// optional and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// OAuthProvider
// ---------------------------------------------------------------------------

/// External identity providers the portal can redirect to.
///
/// The lowercase name is used both as the callback route segment and in
/// the exchange path (`/auth/oauth/github/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
    Apple,
}

impl OAuthProvider {
    /// Path segment / wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
            OAuthProvider::Apple => "apple",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            "apple" => Ok(OAuthProvider::Apple),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown oauth provider: {other}"
            ))),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_json() -> serde_json::Value {
        serde_json::json!({
            "id": "0b6f1c9e-3d7a-4a53-9d0b-5d1f0a7c2e11",
            "first_name": "Abebe",
            "last_name": "Kebede",
            "email": "abebe@ddu.edu.et",
            "role": "STUDENT",
            "user_id": "DDU1400123",
            "is_active": true,
            "is_verified": false,
            "department": "c3a1",
            "year": 3,
            "semester": 2
        })
    }

    #[test]
    fn test_user_profile_optional_fields_default_when_missing() {
        let user: UserProfile = serde_json::from_value(profile_json()).unwrap();

        assert_eq!(user.id, UserId("0b6f1c9e-3d7a-4a53-9d0b-5d1f0a7c2e11".into()));
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.year, Some(3));
        assert!(user.avatar.is_none());
        assert!(user.metadata.is_none());
        assert!(user.date_joined.is_none());
    }

    #[test]
    fn test_user_profile_missing_role_returns_error() {
        let mut json = profile_json();
        json.as_object_mut().unwrap().remove("role");

        let result: Result<UserProfile, _> = serde_json::from_value(json);

        assert!(result.is_err());
    }

    #[test]
    fn test_user_profile_full_name_trims_empty_half() {
        let mut user: UserProfile = serde_json::from_value(profile_json()).unwrap();
        user.last_name = String::new();

        assert_eq!(user.full_name(), "Abebe");
    }

    #[test]
    fn test_user_profile_has_any_role() {
        let user: UserProfile = serde_json::from_value(profile_json()).unwrap();

        assert!(user.has_any_role(&[Role::Student, Role::Lecturer]));
        assert!(!user.has_any_role(&[Role::Admin]));
        assert!(!user.has_any_role(&[]));
    }

    #[test]
    fn test_role_json_is_uppercase() {
        let json = serde_json::to_value(Role::Moderator).unwrap();
        assert_eq!(json, "MODERATOR");
        assert_eq!(Role::Lecturer.to_string(), "LECTURER");
    }

    #[test]
    fn test_role_unknown_value_returns_error() {
        let result: Result<Role, _> = serde_json::from_str(r#""DEAN""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_token_response_accepts_access_alias() {
        let primary: TokenResponse =
            serde_json::from_str(r#"{"access_token":"T1"}"#).unwrap();
        let legacy: TokenResponse = serde_json::from_str(r#"{"access":"T1"}"#).unwrap();

        assert_eq!(primary, legacy);
    }

    #[test]
    fn test_api_error_body_tolerates_field_errors() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"email":["This field is required."]}"#).unwrap();
        assert!(body.detail.is_none());

        let body: ApiErrorBody =
            serde_json::from_str(r#"{"detail":"Invalid or expired refresh token."}"#).unwrap();
        assert_eq!(body.detail.as_deref(), Some("Invalid or expired refresh token."));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            email: "a@b.c".into(),
            password: "s3cret".into(),
        };
        let printed = format!("{creds:?}");

        assert!(printed.contains("a@b.c"));
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn test_oauth_provider_from_str_is_case_insensitive() {
        assert_eq!("GitHub".parse::<OAuthProvider>().unwrap(), OAuthProvider::Github);
        assert_eq!("google".parse::<OAuthProvider>().unwrap(), OAuthProvider::Google);
    }

    #[test]
    fn test_oauth_provider_unknown_returns_invalid_message() {
        let result = "myspace".parse::<OAuthProvider>();
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(m)) if m.contains("myspace")));
    }

    #[test]
    fn test_oauth_code_exchange_json_shape() {
        let json = serde_json::to_value(OAuthCodeExchange { code: "abc".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "code": "abc" }));
    }
}
