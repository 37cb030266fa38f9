//! Offline decoding of bearer credential claims.
//!
//! Only the payload segment is read. The signature is not verified: the
//! backend does that on every request, the client just needs the expiry.

use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// base64url that tolerates both padded and unpadded segments
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A credential whose claims could not be read.
///
/// Every variant means the same thing to callers: the credential is invalid.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed credential: expected 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("Malformed credential: payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Malformed credential: payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed credential: missing numeric exp claim")]
    MissingExpiry,

    #[error("Malformed credential: exp claim {0} out of range")]
    ExpiryOutOfRange(f64),
}

/// Claims the client cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Expired once `now` is strictly past the expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    exp: Option<serde_json::Value>,
}

/// Decode a credential's claims without any network I/O
pub fn decode(credential: &str) -> Result<Claims, CodecError> {
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != 3 {
        return Err(CodecError::SegmentCount(segments.len()));
    }

    let payload = PAYLOAD_ENGINE.decode(segments[1])?;
    let raw: RawClaims = serde_json::from_slice(&payload)?;

    let exp = raw
        .exp
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .ok_or(CodecError::MissingExpiry)?;
    if !exp.is_finite() {
        return Err(CodecError::ExpiryOutOfRange(exp));
    }

    let expires_at = DateTime::<Utc>::from_timestamp(exp.trunc() as i64, 0)
        .ok_or(CodecError::ExpiryOutOfRange(exp))?;

    Ok(Claims { expires_at })
}

/// Build an unsigned token carrying `payload` (test fixtures only)
#[cfg(test)]
pub(crate) fn encode_unsigned(payload: &serde_json::Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
