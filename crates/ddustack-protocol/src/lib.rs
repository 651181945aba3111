//! Wire protocol for the DDUSTACK API client.
//!
//! This crate defines the payloads the portal exchanges with the REST API:
//!
//! - **Types** ([`UserProfile`], [`Role`], [`AuthResponse`], etc.):
//!   the JSON bodies that travel on the wire.
//! - **Endpoints** ([`endpoints`]): the fixed paths the session core
//!   depends on.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those payloads
//!   are converted to/from bytes. File uploads use [`FilePart`] instead.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw HTTP bodies) and session
//! (tokens and identity). It doesn't know about requests or retries;
//! it only knows what the API's JSON looks like.
//!
//! ```text
//! Transport (bytes) → Protocol (typed payloads) → Session (token + user)
//! ```

mod codec;
mod error;
mod form;
mod types;

pub mod endpoints;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use form::FilePart;
pub use types::{
    ApiErrorBody, AuthResponse, AvatarResponse, Credentials, EmailCheck, EmailCheckResponse,
    OAuthCodeExchange, OAuthProvider, RegisterRequest, Role, TokenResponse,
    UserId, UserProfile,
};
