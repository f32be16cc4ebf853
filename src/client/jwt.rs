//! Access token expiry estimation
//!
//! The access token is decoded WITHOUT signature verification. The client is
//! not a security boundary: the decoded `exp` claim is untrusted and only used
//! to schedule renewal. Never base an authorization decision on it.

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

/// Seconds before expiry at which a token counts as "expiring soon"
pub const DEFAULT_EXPIRY_LEEWAY_SECS: i64 = 60;

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<Value>,
}

/// Decode the `exp` claim (epoch seconds) from a JWT-shaped token.
///
/// Returns `None` when the token is not three dot-separated segments, the
/// payload is not base64url JSON, or `exp` is missing or not numeric.
pub fn decode_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;

    match claims.exp? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Whether a token expiring at `exp` should be renewed at time `now`
pub fn is_expiring(exp: i64, now: i64, leeway_secs: i64) -> bool {
    exp.saturating_sub(now) <= leeway_secs
}

/// Whether a known expiry is within the leeway of the current time.
///
/// An unknown expiry never triggers pre-emptive renewal; the request relies
/// on 401 handling instead.
pub fn needs_renewal(expiry: Option<i64>, leeway_secs: i64) -> bool {
    expiry.is_some_and(|exp| is_expiring(exp, Utc::now().timestamp(), leeway_secs))
}

#[cfg(test)]
pub(crate) fn token_with_claims(claims: &Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
pub(crate) fn token_expiring_at(exp: i64) -> String {
    token_with_claims(&serde_json::json!({ "exp": exp, "user_id": 7 }))
}
