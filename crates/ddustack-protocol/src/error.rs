//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the shape of a payload, not in
//! networking or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: an HTML error page where JSON was expected,
    /// missing required fields, or a field with the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value is well-formed but not something the protocol accepts,
    /// e.g. an unknown OAuth provider name in a callback path.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
