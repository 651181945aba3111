/// Errors that can occur in the transport layer.
///
/// None of these carry an HTTP status: a response with any status code is
/// a successful transport round-trip. These are the "transient network
/// failure" cases the session layer propagates unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("client build failed: {0}")]
    Build(String),

    /// The base URL or a joined endpoint is not a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The server could not be reached.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Sending the request failed for another reason.
    #[error("request failed: {0}")]
    Request(String),

    /// The response arrived but its body could not be read.
    #[error("reading response body failed: {0}")]
    Body(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}
