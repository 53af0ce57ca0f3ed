//! Identity envelope extraction.
//!
//! The API gateway verifies inbound tokens and forwards the verified claims
//! in the `X-Endpoint-API-UserInfo` header as base64-encoded JSON. Two
//! header shapes exist:
//!
//! - legacy: `{"claims": "<json string>", ...}` — the claims arrive doubly
//!   encoded, as a JSON string inside JSON;
//! - current: the decoded object *is* the claims.
//!
//! Detection tries the legacy shape first (a `claims` key whose value is
//! itself parseable JSON) and falls back to the current shape.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use thiserror::Error;

use fluidly_auth::Claims;

/// Header the gateway forwards verified claims in.
pub const USER_INFO_HEADER: &str = "X-Endpoint-API-UserInfo";

#[derive(Debug, Error)]
pub enum UserInfoError {
    #[error("user info is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("user info is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("user info is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode base64 that may arrive without standard `=` padding.
///
/// The gateway strips padding; pad back to a multiple of 4 before decoding.
/// Input of length ≡ 1 (mod 4) is not valid base64 and fails cleanly.
pub fn base64_decode_padded(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let missing = (4 - encoded.len() % 4) % 4;
    if missing == 0 {
        return STANDARD.decode(encoded);
    }

    let mut padded = String::with_capacity(encoded.len() + missing);
    padded.push_str(encoded);
    for _ in 0..missing {
        padded.push('=');
    }
    STANDARD.decode(padded)
}

/// Decode the forwarded identity envelope into normalized claims.
pub fn decode_user_info(encoded: &str) -> Result<Claims, UserInfoError> {
    let decoded = String::from_utf8(base64_decode_padded(encoded)?)?;
    let envelope: Value = serde_json::from_str(&decoded)?;

    if let Some(claims_str) = envelope.get("claims").and_then(Value::as_str) {
        if let Ok(inner) = serde_json::from_str::<Value>(claims_str) {
            return Ok(Claims::from_value(inner));
        }
    }

    Ok(Claims::from_value(envelope))
}
