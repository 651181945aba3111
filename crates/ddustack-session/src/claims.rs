//! Reads the `exp` claim out of a JWT access token.
//!
//! No signature check happens here; the API is the authority on whether a
//! token is valid. This only tells the gatekeeper when a 401 is certain so
//! it can refresh first instead of wasting a round trip.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: Option<u64>,
}

/// Expiry time of a JWT, or `None` if `token` is not a JWT with an `exp`.
pub fn expires_at(token: &str) -> Option<SystemTime> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    Some(UNIX_EPOCH + Duration::from_secs(claims.exp?))
}

/// `true` if the token is expired at `now`. Malformed tokens count as expired.
pub fn is_expired(token: &str, now: SystemTime) -> bool {
    expires_at(token).is_none_or(|exp| exp <= now)
}

/// `true` only for a JWT whose `exp` falls before `now + leeway`.
///
/// Unlike [`is_expired`], opaque tokens return `false`: without a claim to
/// read, only the API can say whether they still work.
pub(crate) fn expires_within(token: &str, now: SystemTime, leeway: Duration) -> bool {
    expires_at(token).is_some_and(|exp| exp <= now + leeway)
}

#[cfg(test)]
pub(crate) fn jwt_with_exp(exp: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"access","exp":{exp}}}"#));
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
