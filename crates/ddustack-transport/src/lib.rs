//! Transport abstraction layer for the DDUSTACK client.
//!
//! Provides the [`ApiTransport`] trait that abstracts over how an
//! [`ApiRequest`] reaches the API, plus the request/response types that
//! cross it. The session layer only ever talks to this trait, so tests can
//! swap in an in-memory backend.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpTransport`] via `reqwest`, with a cookie
//!   store for the ambient refresh cookie.

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::fmt;
use std::future::Future;

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// An encoded request body and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A request to the API, relative to the transport's base URL.
///
/// Requests are `Clone` because the session layer may replay one after a
/// token refresh. The bearer token is a separate field, not a header, so
/// a replay can swap it without touching anything else.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/users/me/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// Creates a request with no query, headers, body, or token.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets an already-encoded body.
    pub fn body(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.body = Some(Body {
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    /// Returns a copy that will be sent with `Authorization: Bearer <token>`,
    /// or with no authorization header when `token` is `None`.
    pub fn with_bearer(&self, token: Option<String>) -> Self {
        Self {
            bearer: token,
            ..self.clone()
        }
    }
}

// Hand-written so bearer tokens never end up in logs.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(|b| b.bytes.len()))
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A response from the API. Any status code counts as a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The API's signal for a missing, expired, or invalid access token.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Body as text, replacing invalid UTF-8. Intended for log lines.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests to the API.
///
/// - `Send + Sync + 'static` → one transport is shared by every request
///   the gatekeeper issues, from any task.
/// - The returned future is `Send` so gatekeeper operations can be
///   spawned onto a multi-threaded runtime.
///
/// Implementations return `Ok` for every response that arrived, whatever
/// its status. `Err` is reserved for requests that never got an answer.
pub trait ApiTransport: Send + Sync + 'static {
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_bearer_replaces_only_token() {
        let original = ApiRequest::get("/contents/")
            .query("page", "2")
            .with_bearer(Some("T1".into()));

        let replayed = original.with_bearer(Some("T2".into()));

        assert_eq!(replayed.bearer.as_deref(), Some("T2"));
        assert_eq!(replayed.path, original.path);
        assert_eq!(replayed.query, original.query);
        assert_eq!(original.bearer.as_deref(), Some("T1"));
    }

    #[test]
    fn test_request_debug_redacts_bearer() {
        let req = ApiRequest::get("/users/me/").with_bearer(Some("eyJsecret".into()));
        let printed = format!("{req:?}");

        assert!(printed.contains("/users/me/"));
        assert!(!printed.contains("eyJsecret"));
    }

    #[test]
    fn test_response_status_helpers() {
        assert!(ApiResponse::new(204, Vec::new()).is_success());
        assert!(!ApiResponse::new(301, Vec::new()).is_success());
        assert!(ApiResponse::new(401, Vec::new()).is_unauthorized());
        assert!(!ApiResponse::new(403, Vec::new()).is_unauthorized());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
