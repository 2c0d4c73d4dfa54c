//! Unverified JWT payload decoding.
//!
//! The login token is a JWT issued by the vendor. Only its `accountId` claim is needed to look up
//! the user profile. The signature is NOT verified, the token is trusted because it was just
//! received over TLS from the login endpoint. Do not reuse this for tokens from other sources.

use super::Error;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};

const ACCOUNT_ID: &str = "accountId";

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn decode_segment(segment: &str) -> Result<Map<String, Value>, Error> {
    let bytes = URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|e| Error::TokenError(e.to_string()))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::TokenError(String::from("segment is not a JSON object"))),
        Err(e) => Err(Error::TokenError(e.to_string())),
    }
}

/// Decode the claims of `token` without checking its signature.
pub fn claims(token: &str) -> Result<Map<String, Value>, Error> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(Error::TokenError(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    /* header has to be well-formed even though it is not used */
    decode_segment(segments[0])?;
    decode_segment(segments[1])
}

/// Read the `accountId` claim. `Ok(None)` if the token decodes but carries no usable claim.
pub fn account_id(token: &str) -> Result<Option<String>, Error> {
    let claims = claims(token)?;

    Ok(match claims.get(ACCOUNT_ID) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.to_owned()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
