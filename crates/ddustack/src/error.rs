//! Unified error type for the DDUSTACK client.

use ddustack_protocol::ProtocolError;
use ddustack_session::SessionError;
use ddustack_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `ddustack` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
#[derive(Debug, thiserror::Error)]
pub enum DdustackError {
    /// The HTTP client could not be built or a request never got an answer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Authentication or an authorized call failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A setting is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
