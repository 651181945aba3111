//! Codec trait and implementations for serializing/deserializing payloads.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The session layer doesn't care HOW bodies are serialized; it just
//! needs something that implements the [`Codec`] trait. The API speaks
//! JSON, so [`JsonCodec`] is the only implementation today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// - `Send + Sync` → shared by every request the gatekeeper issues,
///   possibly from different tokio worker threads.
/// - `'static` → it owns everything it needs, so it can live inside
///   long-lived shared state.
pub trait Codec: Send + Sync + 'static {
    /// MIME type sent in the `Content-Type` header for encoded bodies.
    fn content_type(&self) -> &'static str;

    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use ddustack_protocol::{Codec, JsonCodec, TokenResponse};
///
/// let codec = JsonCodec;
/// let token: TokenResponse = codec.decode(br#"{"access_token":"T1"}"#).unwrap();
/// assert_eq!(token.access_token, "T1");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthResponse, Credentials, Role};

    #[test]
    fn test_encode_credentials_produces_flat_json() {
        let codec = JsonCodec;
        let bytes = codec
            .encode(&Credentials {
                email: "ada@ddu.edu.et".into(),
                password: "hunter2".into(),
            })
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["email"], "ada@ddu.edu.et");
        assert_eq!(value["password"], "hunter2");
    }

    #[test]
    fn test_decode_auth_response_with_user() {
        let body = br#"{
            "access_token": "T1",
            "user": {
                "id": "7f0c",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@ddu.edu.et",
                "role": "ADMIN",
                "user_id": null,
                "is_active": true,
                "is_verified": true,
                "department": null,
                "year": null,
                "semester": null
            }
        }"#;

        let resp: AuthResponse = JsonCodec.decode(body).unwrap();

        assert_eq!(resp.access_token, "T1");
        assert_eq!(resp.user.role, Role::Admin);
        assert_eq!(resp.user.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_decode_html_error_page_returns_decode_error() {
        let result: Result<AuthResponse, _> =
            JsonCodec.decode(b"<html>502 Bad Gateway</html>");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_content_type_is_json() {
        assert_eq!(JsonCodec.content_type(), "application/json");
    }
}
